//! Host-side wiring: location sources feeding the tracker.
//!
//! The engine itself is synchronous; this module owns the async loop that
//! waits for position samples and hands them over one at a time. Samples can
//! come from a recorded walk (JSON lines) or a seeded random wander for
//! demos. The CLI's notification and sound sinks just log — on device the
//! app supplies real implementations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::geo::Coordinate;
use crate::metrics;
use crate::poi::PointOfInterest;
use crate::tracker::{NotificationSink, SoundCue, SoundPlayer, VisitTracker};

/// One observed position. Each sample fully supersedes the previous one; the
/// engine keeps no history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl PositionSample {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Anything that can produce a stream of position samples. Delivery rate is
/// unspecified; the consumer tolerates arbitrary gaps, including none at all.
pub trait LocationSource {
    fn start(self: Box<Self>) -> mpsc::UnboundedReceiver<PositionSample>;
}

/// Replays a JSON-lines file of samples. With pacing enabled, gaps between
/// `recordedAt` stamps are honored (clamped to 5 s so an overnight gap in a
/// recording does not stall the replay).
pub struct ReplaySource {
    path: PathBuf,
    paced: bool,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, paced: bool) -> Self {
        Self {
            path: path.into(),
            paced,
        }
    }
}

const MAX_PACING_GAP: Duration = Duration::from_secs(5);

impl LocationSource for ReplaySource {
    fn start(self: Box<Self>) -> mpsc::UnboundedReceiver<PositionSample> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("failed to read replay file {:?}: {}", self.path, e);
                    return;
                }
            };

            let mut previous: Option<DateTime<Utc>> = None;
            for (lineno, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let sample: PositionSample = match serde_json::from_str(line) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("skipping malformed sample on line {}: {}", lineno + 1, e);
                        continue;
                    }
                };

                if self.paced {
                    if let (Some(prev), Some(now)) = (previous, sample.recorded_at) {
                        if let Ok(gap) = (now - prev).to_std() {
                            tokio::time::sleep(gap.min(MAX_PACING_GAP)).await;
                        }
                    }
                    previous = sample.recorded_at;
                }

                if tx.send(sample).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

/// A seeded random walk: the heading drifts a little every step, like a kid
/// zig-zagging down a trail. Useful for demos against the starter zone.
pub struct WanderSource {
    start: Coordinate,
    steps: u32,
    step_m: f64,
    interval: Duration,
    seed: u64,
}

impl WanderSource {
    pub fn new(start: Coordinate, steps: u32, seed: u64) -> Self {
        Self {
            start,
            steps,
            step_m: 15.0,
            interval: Duration::from_millis(200),
            seed,
        }
    }

    pub fn with_step_m(mut self, step_m: f64) -> Self {
        self.step_m = step_m;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl LocationSource for WanderSource {
    fn start(self: Box<Self>) -> mpsc::UnboundedReceiver<PositionSample> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let mut position = self.start;
            let mut heading: f64 = rng.gen_range(0.0..360.0);

            for _ in 0..self.steps {
                let sample = PositionSample {
                    latitude: position.latitude,
                    longitude: position.longitude,
                    recorded_at: Some(Utc::now()),
                };
                if tx.send(sample).is_err() {
                    break;
                }

                heading = (heading + rng.gen_range(-40.0..40.0)).rem_euclid(360.0);
                position = position.offset(self.step_m, heading);
                tokio::time::sleep(self.interval).await;
            }
        });
        rx
    }
}

/// Notification sink that writes to the log. Stand-in for the app's local
/// notification scheduler when running from the CLI.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!("[notify] {}: {}", title, body);
    }
}

/// Sound sink that writes to the log.
pub struct LogSoundPlayer;

impl SoundPlayer for LogSoundPlayer {
    fn play(&self, cue: SoundCue, volume: f32) {
        info!("[sound] {} (volume {:.1})", cue.cue_name(), volume);
    }
}

/// Progress summary for a zone, used by `status` and the session shutdown log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZoneProgress {
    pub total: usize,
    pub fences: usize,
    pub visited: usize,
    pub quizzes: usize,
    pub quizzes_completed: usize,
}

impl ZoneProgress {
    pub fn from_pois(pois: &[PointOfInterest]) -> Self {
        let mut progress = ZoneProgress::default();
        for poi in pois {
            if poi.category.is_fence() {
                progress.fences += 1;
                continue;
            }
            progress.total += 1;
            if poi.visited {
                progress.visited += 1;
            }
            if poi.quiz.is_some() {
                progress.quizzes += 1;
                if poi.quiz_completed {
                    progress.quizzes_completed += 1;
                }
            }
        }
        progress
    }
}

/// Drives a tracker from a location source until the source runs dry or the
/// user interrupts.
pub struct TrailSession {
    tracker: VisitTracker,
}

impl TrailSession {
    pub fn new(tracker: VisitTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &VisitTracker {
        &self.tracker
    }

    pub async fn run(&mut self, source: Box<dyn LocationSource>) -> Result<()> {
        let mut rx = source.start();
        info!("session started for zone {}", self.tracker.zone());

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, ending session");
                    break;
                }
                sample = rx.recv() => {
                    match sample {
                        Some(sample) => {
                            let events = self.tracker.handle_position(sample.coordinate());
                            debug!("{} event(s) this update", events.len());
                        }
                        None => {
                            info!("location source finished");
                            break;
                        }
                    }
                }
            }
        }

        self.log_summary();
        Ok(())
    }

    fn log_summary(&self) {
        let progress = ZoneProgress::from_pois(self.tracker.pois());
        let snap = metrics::snapshot();
        info!(
            "session summary: {}/{} visited, {}/{} quizzes done, {} updates, {} fence alerts, {} persist failures",
            progress.visited,
            progress.total,
            progress.quizzes_completed,
            progress.quizzes,
            snap.position_updates,
            snap.fence_breaches,
            snap.persist_failures
        );
    }
}

/// Parse a `lat,lon` CLI argument.
pub fn parse_start_coordinate(value: &str) -> Result<Coordinate> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected LAT,LON but got '{}'", value))?;
    let latitude: f64 = lat.trim().parse()?;
    let longitude: f64 = lon.trim().parse()?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(anyhow!("coordinate out of range: '{}'", value));
    }
    Ok(Coordinate::new(latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poi::PoiCategory;

    #[test]
    fn zone_progress_counts() {
        let mut pois = crate::storage::starter_zone_pois("forest");
        pois[0].visited = true;
        pois[0].quiz_completed = true;

        let progress = ZoneProgress::from_pois(&pois);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.fences, 1);
        assert_eq!(progress.visited, 1);
        assert_eq!(progress.quizzes, 1);
        assert_eq!(progress.quizzes_completed, 1);

        // Quiz bookkeeping ignores fences even if a stale document tried.
        let fence = PointOfInterest::new(
            "f2",
            "F",
            "",
            Coordinate::new(0.0, 0.0),
            PoiCategory::Fence,
            "forest",
        );
        let mut with_fence = pois.clone();
        with_fence.push(fence);
        assert_eq!(ZoneProgress::from_pois(&with_fence).total, 3);
    }

    #[test]
    fn parse_start_coordinate_accepts_lat_lon() {
        let c = parse_start_coordinate("57.689, 11.975").unwrap();
        assert!((c.latitude - 57.689).abs() < 1e-9);
        assert!((c.longitude - 11.975).abs() < 1e-9);

        assert!(parse_start_coordinate("57.689").is_err());
        assert!(parse_start_coordinate("91.0,0.0").is_err());
        assert!(parse_start_coordinate("abc,def").is_err());
    }

    #[test]
    fn wander_source_emits_the_requested_steps() {
        tokio_test::block_on(async {
            let source = Box::new(
                WanderSource::new(Coordinate::new(0.0, 0.0), 5, 1)
                    .with_interval(Duration::from_millis(1)),
            );
            let mut rx = source.start();
            let mut count = 0;
            while rx.recv().await.is_some() {
                count += 1;
            }
            assert_eq!(count, 5);
        });
    }

    #[test]
    fn sample_wire_shape_is_camel_case() {
        let json = r#"{"latitude": 1.5, "longitude": 2.5, "recordedAt": "2026-08-01T10:00:00Z"}"#;
        let sample: PositionSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.coordinate(), Coordinate::new(1.5, 2.5));
        assert!(sample.recorded_at.is_some());

        // recordedAt is optional.
        let sample: PositionSample =
            serde_json::from_str(r#"{"latitude": 0.0, "longitude": 0.0}"#).unwrap();
        assert!(sample.recorded_at.is_none());
    }
}
