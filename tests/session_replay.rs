//! End-to-end session runs: a recorded walk replayed through the tracker and
//! a seeded wander, both against tempdir-backed zones.

mod common;

use std::io::Write;

use common::{lat_for_meters, origin_zone, reload_zone, RecordingSinks};
use tempfile::TempDir;

use wildtales::geo::Coordinate;
use wildtales::session::{ReplaySource, TrailSession, WanderSource};
use wildtales::storage::PoiStore;
use wildtales::tracker::VisitTracker;

fn session_over(pois: &[wildtales::poi::PointOfInterest]) -> (TempDir, TrailSession, RecordingSinks) {
    let dir = TempDir::new().expect("tempdir");
    let store = PoiStore::open(dir.path()).expect("store");
    store.save("origin", pois).expect("seed zone");

    let sinks = RecordingSinks::default();
    let tracker = VisitTracker::open(
        PoiStore::open(dir.path()).expect("store"),
        "origin",
        Box::new(sinks.clone()),
        Box::new(sinks.clone()),
    )
    .expect("tracker");
    (dir, TrailSession::new(tracker), sinks)
}

#[tokio::test]
async fn replayed_walk_discovers_the_oak() {
    let (dir, mut session, sinks) = session_over(&origin_zone());

    // A walk that starts far away, approaches the oak, and leaves again.
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for m in [400.0, 150.0, 45.0, 10.0, 200.0] {
        writeln!(
            file,
            r#"{{"latitude": {}, "longitude": 0.0}}"#,
            lat_for_meters(m)
        )
        .unwrap();
    }
    file.flush().unwrap();

    session
        .run(Box::new(ReplaySource::new(file.path(), false)))
        .await
        .unwrap();

    // Discovered exactly once despite two in-radius samples.
    let visited_cues = sinks
        .cue_names()
        .iter()
        .filter(|c| **c == "visited")
        .count();
    assert_eq!(visited_cues, 1);

    let reloaded = reload_zone(&dir, "origin");
    assert!(reloaded.iter().find(|p| p.id == "origin-oak").unwrap().visited);
}

#[tokio::test]
async fn malformed_replay_lines_are_skipped() {
    let (_dir, mut session, sinks) = session_over(&origin_zone());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, r#"{{"latitude": 0.0, "longitude": 0.0}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"latitude": "oops"}}"#).unwrap();
    file.flush().unwrap();

    session
        .run(Box::new(ReplaySource::new(file.path(), false)))
        .await
        .unwrap();

    // The one good sample still landed and visited the oak.
    assert_eq!(sinks.cue_names(), ["visited"]);
}

#[tokio::test]
async fn missing_replay_file_ends_cleanly() {
    let (_dir, mut session, sinks) = session_over(&origin_zone());

    session
        .run(Box::new(ReplaySource::new("/nonexistent/walk.jsonl", false)))
        .await
        .unwrap();
    assert!(sinks.cue_names().is_empty());
}

#[tokio::test]
async fn seeded_wander_is_reproducible() {
    let start = Coordinate::new(lat_for_meters(200.0), 0.0);

    let run = |seed: u64| async move {
        let (_dir, mut session, sinks) = session_over(&origin_zone());
        let source = WanderSource::new(start, 40, seed)
            .with_interval(std::time::Duration::from_millis(1));
        session.run(Box::new(source)).await.unwrap();
        sinks.cue_names()
    };

    let first = run(7).await;
    let second = run(7).await;
    assert_eq!(first, second);
}
