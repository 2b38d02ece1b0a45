//! The visit tracker: the engine behind the treasure-hunt map.
//!
//! Fed one position sample at a time, it classifies the walker's distance to
//! every POI in the active zone, drives the one-shot visit and quiz
//! transitions, raises notification/sound triggers through injected sinks,
//! and persists the zone document after each mutation. Everything here is
//! synchronous and single-threaded; the host decides when samples arrive.

use std::collections::HashMap;

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::logutil::{escape_log, fmt_coord};
use crate::metrics;
use crate::poi::{PointOfInterest, VisitState};
use crate::storage::{PoiStore, StoreError};

/// Proximity threshold marking a POI as visited.
pub const DEFAULT_VISIT_RADIUS_M: f64 = 50.0;
/// Threshold past which a fence marker raises a safety alert.
pub const DEFAULT_BREACH_RADIUS_M: f64 = 500.0;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("unknown point of interest: {0}")]
    UnknownPoi(String),

    /// Caller bug: quiz resolution is only valid for a visited POI that
    /// carries a quiz. The quiz UI is never shown otherwise.
    #[error("quiz not available for point of interest: {0}")]
    QuizUnavailable(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Named sound cues the host maps onto actual audio assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Visited,
    FenceAlarm,
    QuizCorrect,
}

impl SoundCue {
    pub fn cue_name(&self) -> &'static str {
        match self {
            SoundCue::Visited => "visited",
            SoundCue::FenceAlarm => "fence-alarm",
            SoundCue::QuizCorrect => "quiz-correct",
        }
    }
}

/// Fire-and-forget local notification requests.
pub trait NotificationSink {
    fn notify(&self, title: &str, body: &str);
}

/// Fire-and-forget sound effect playback.
pub trait SoundPlayer {
    fn play(&self, cue: SoundCue, volume: f32);
}

/// Events raised by a single position update, in POI list order.
#[derive(Debug, Clone, PartialEq)]
pub enum TrailEvent {
    /// The walker came within the visit radius of an unvisited POI.
    /// At most once per POI, ever.
    ProximityReached {
        poi_id: String,
        name: String,
        distance_m: f64,
    },
    /// The walker is outside a fence marker's breach radius. Raised on every
    /// update while the condition holds; fence markers keep no state.
    FenceBreached {
        poi_id: String,
        name: String,
        distance_m: f64,
    },
}

pub struct VisitTracker {
    zone: String,
    pois: Vec<PointOfInterest>,
    states: HashMap<String, VisitState>,
    visit_radius_m: f64,
    breach_radius_m: f64,
    sound_volume: f32,
    store: PoiStore,
    notifier: Box<dyn NotificationSink>,
    sounds: Box<dyn SoundPlayer>,
}

impl VisitTracker {
    /// Load the zone's POI list from the store and build the per-POI state
    /// map from the sticky flags.
    pub fn open(
        store: PoiStore,
        zone: &str,
        notifier: Box<dyn NotificationSink>,
        sounds: Box<dyn SoundPlayer>,
    ) -> Result<Self, TrailError> {
        let pois = store.load(zone)?;
        let states = pois
            .iter()
            .filter(|p| !p.category.is_fence())
            .map(|p| (p.id.clone(), p.visit_state()))
            .collect();

        info!("tracker opened for zone {} with {} pois", zone, pois.len());

        Ok(Self {
            zone: zone.to_string(),
            pois,
            states,
            visit_radius_m: DEFAULT_VISIT_RADIUS_M,
            breach_radius_m: DEFAULT_BREACH_RADIUS_M,
            sound_volume: 0.8,
            store,
            notifier,
            sounds,
        })
    }

    pub fn with_radii(mut self, visit_radius_m: f64, breach_radius_m: f64) -> Self {
        self.visit_radius_m = visit_radius_m;
        self.breach_radius_m = breach_radius_m;
        self
    }

    pub fn with_sound_volume(mut self, volume: f32) -> Self {
        self.sound_volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    /// Classify one position sample against every POI in the zone and drive
    /// the resulting transitions. Returns the raised events in POI list
    /// order; the zone document is persisted when any POI changed.
    pub fn handle_position(&mut self, position: Coordinate) -> Vec<TrailEvent> {
        metrics::inc_position_updates();
        debug!("position update {}", fmt_coord(&position));

        let now = Utc::now();
        let mut events = Vec::new();
        let mut changed = false;

        for poi in &mut self.pois {
            let distance_m = position.distance_m(&poi.coordinate);

            if poi.category.is_fence() {
                if distance_m > self.breach_radius_m {
                    // Repeats on every sample while the walker stays outside.
                    events.push(TrailEvent::FenceBreached {
                        poi_id: poi.id.clone(),
                        name: poi.name.clone(),
                        distance_m,
                    });
                }
                continue;
            }

            let state = self
                .states
                .get(&poi.id)
                .copied()
                .unwrap_or_else(|| poi.visit_state());

            if distance_m < self.visit_radius_m && !state.is_visited() {
                let next = state.on_proximity();
                self.states.insert(poi.id.clone(), next);
                poi.apply_state(next, now);
                changed = true;
                events.push(TrailEvent::ProximityReached {
                    poi_id: poi.id.clone(),
                    name: poi.name.clone(),
                    distance_m,
                });
            }
        }

        for event in &events {
            self.dispatch(event);
        }

        if changed {
            self.persist();
        }

        events
    }

    /// Resolve a quiz answer for a visited POI. A correct answer completes
    /// the quiz and persists; a second correct answer is a no-op that still
    /// reports success. Wrong answers change nothing and can be retried
    /// without limit.
    pub fn answer_quiz(&mut self, poi_id: &str, answer_index: usize) -> Result<bool, TrailError> {
        let poi = self
            .pois
            .iter_mut()
            .find(|p| p.id == poi_id)
            .ok_or_else(|| TrailError::UnknownPoi(poi_id.to_string()))?;

        let state = poi.visit_state();
        let quiz = match &poi.quiz {
            Some(q) if state.is_visited() => q,
            _ => return Err(TrailError::QuizUnavailable(poi_id.to_string())),
        };

        if !quiz.is_correct(answer_index) {
            metrics::inc_quiz_wrong();
            debug!(
                "wrong quiz answer {} for poi {}",
                answer_index,
                escape_log(poi_id)
            );
            return Ok(false);
        }

        metrics::inc_quiz_correct();

        if poi.quiz_completed {
            // Already done; nothing to mutate or persist.
            return Ok(true);
        }

        let next = state.on_correct_answer();
        poi.apply_state(next, Utc::now());
        self.states.insert(poi.id.clone(), next);
        info!("quiz completed for poi {}", escape_log(poi_id));

        self.sounds.play(SoundCue::QuizCorrect, self.sound_volume);
        self.persist();
        Ok(true)
    }

    fn dispatch(&self, event: &TrailEvent) {
        match event {
            TrailEvent::ProximityReached {
                poi_id,
                name,
                distance_m,
            } => {
                metrics::inc_proximity_events();
                let body = self
                    .pois
                    .iter()
                    .find(|p| p.id == *poi_id)
                    .map(|p| p.description.clone())
                    .unwrap_or_default();
                self.notifier
                    .notify(&format!("You found {}!", name), &body);
                self.sounds.play(SoundCue::Visited, self.sound_volume);
                info!(
                    "visited poi {} at {:.0} m",
                    escape_log(name),
                    distance_m
                );
            }
            TrailEvent::FenceBreached {
                name, distance_m, ..
            } => {
                metrics::inc_fence_breaches();
                self.notifier.notify(
                    "Too far from the trail!",
                    &format!("Head back toward {}", name),
                );
                self.sounds.play(SoundCue::FenceAlarm, self.sound_volume);
                warn!(
                    "fence {} breached at {:.0} m",
                    escape_log(name),
                    distance_m
                );
            }
        }
    }

    /// Whole-document overwrite after a mutation. A write failure is logged
    /// and dropped; the in-memory list stays authoritative for the session.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.zone, &self.pois) {
            metrics::inc_persist_failures();
            warn!(
                "failed to persist zone {}: {} (keeping in-memory state)",
                self.zone, e
            );
        }
    }
}
