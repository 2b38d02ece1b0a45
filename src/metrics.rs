//! Session counters for the trail engine. Global atomics keep the tracker
//! free of plumbing; `status` and the session shutdown path read a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

static POSITION_UPDATES: AtomicU64 = AtomicU64::new(0);
static PROXIMITY_EVENTS: AtomicU64 = AtomicU64::new(0);
static FENCE_BREACHES: AtomicU64 = AtomicU64::new(0);
static QUIZ_CORRECT: AtomicU64 = AtomicU64::new(0);
static QUIZ_WRONG: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_position_updates() {
    POSITION_UPDATES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_proximity_events() {
    PROXIMITY_EVENTS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_fence_breaches() {
    FENCE_BREACHES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_quiz_correct() {
    QUIZ_CORRECT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_quiz_wrong() {
    QUIZ_WRONG.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_persist_failures() {
    PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub position_updates: u64,
    pub proximity_events: u64,
    pub fence_breaches: u64,
    pub quiz_correct: u64,
    pub quiz_wrong: u64,
    pub persist_failures: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        position_updates: POSITION_UPDATES.load(Ordering::Relaxed),
        proximity_events: PROXIMITY_EVENTS.load(Ordering::Relaxed),
        fence_breaches: FENCE_BREACHES.load(Ordering::Relaxed),
        quiz_correct: QUIZ_CORRECT.load(Ordering::Relaxed),
        quiz_wrong: QUIZ_WRONG.load(Ordering::Relaxed),
        persist_failures: PERSIST_FAILURES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
pub(crate) fn reset_for_tests() {
    POSITION_UPDATES.store(0, Ordering::Relaxed);
    PROXIMITY_EVENTS.store(0, Ordering::Relaxed);
    FENCE_BREACHES.store(0, Ordering::Relaxed);
    QUIZ_CORRECT.store(0, Ordering::Relaxed);
    QUIZ_WRONG.store(0, Ordering::Relaxed);
    PERSIST_FAILURES.store(0, Ordering::Relaxed);
}
