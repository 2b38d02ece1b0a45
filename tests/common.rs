//! Test utilities & fixtures shared by the integration suites.
#![allow(dead_code)] // Not every suite uses every helper.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use wildtales::geo::Coordinate;
use wildtales::poi::{PoiCategory, PointOfInterest, Quiz};
use wildtales::storage::PoiStore;
use wildtales::tracker::{NotificationSink, SoundCue, SoundPlayer, VisitTracker};

/// Degrees of latitude roughly equal to `m` meters at the equator.
pub fn lat_for_meters(m: f64) -> f64 {
    m / 111_320.0
}

/// Recording doubles for the notification and sound sinks.
#[derive(Clone, Default)]
pub struct RecordingSinks {
    pub notifications: Arc<Mutex<Vec<(String, String)>>>,
    pub cues: Arc<Mutex<Vec<(&'static str, f32)>>>,
}

impl RecordingSinks {
    pub fn notification_titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn cue_names(&self) -> Vec<&'static str> {
        self.cues.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }
}

impl NotificationSink for RecordingSinks {
    fn notify(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

impl SoundPlayer for RecordingSinks {
    fn play(&self, cue: SoundCue, volume: f32) {
        self.cues.lock().unwrap().push((cue.cue_name(), volume));
    }
}

/// A zone with one quizzed POI at the origin and a fence marker, the smallest
/// layout that exercises both proximity semantics.
pub fn origin_zone() -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new(
            "origin-oak",
            "Origin Oak",
            "An oak growing exactly on the equator",
            Coordinate::new(0.0, 0.0),
            PoiCategory::Plant,
            "origin",
        )
        .with_quiz(Quiz::new(
            "What season do oaks drop acorns?",
            vec!["Spring".into(), "Autumn".into(), "Winter".into()],
            1,
        )),
        PointOfInterest::new(
            "origin-fence",
            "Base Camp",
            "Stay close to base camp",
            Coordinate::new(0.0, 0.0),
            PoiCategory::Fence,
            "origin",
        ),
    ]
}

/// Seed a tempdir-backed store with `pois` and open a tracker over it.
pub fn tracker_over(
    pois: &[PointOfInterest],
    zone: &str,
) -> (TempDir, VisitTracker, RecordingSinks) {
    let dir = TempDir::new().expect("tempdir");
    let store = PoiStore::open(dir.path()).expect("store");
    store.save(zone, pois).expect("seed zone");

    let sinks = RecordingSinks::default();
    let tracker = VisitTracker::open(
        PoiStore::open(dir.path()).expect("store"),
        zone,
        Box::new(sinks.clone()),
        Box::new(sinks.clone()),
    )
    .expect("tracker");
    (dir, tracker, sinks)
}

/// Re-open the zone with a fresh store, as the next app launch would.
pub fn reload_zone(dir: &TempDir, zone: &str) -> Vec<PointOfInterest> {
    PoiStore::open(dir.path())
        .expect("store")
        .load(zone)
        .expect("load zone")
}
