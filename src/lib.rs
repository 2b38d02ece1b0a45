//! # WildTales Trail Engine
//!
//! The headless engine behind the WildTales outdoor exploration app: it
//! tracks a walker's position against a zone's points of interest, drives
//! one-shot visit and quiz transitions, raises notification and sound
//! triggers, and persists trail progress to JSON zone documents.
//!
//! ## Features
//!
//! - **Visit Tracking**: Haversine proximity classification with sticky,
//!   at-most-once visited transitions per POI.
//! - **Geofencing**: Inverted `fence` markers that alert whenever the walker
//!   strays past the breach radius.
//! - **Quizzes**: Multiple-choice questions unlocked by visiting, with
//!   idempotent completion and unlimited retries.
//! - **Custom Maps**: User-placed POIs with UUID ids, removal, and progress
//!   reset, persisted per zone.
//! - **Resilient Persistence**: Whole-document JSON zone files written
//!   atomically under a file lock; corrupt documents degrade to an empty
//!   list instead of failing the session.
//! - **Trail Data Backups**: tar.gz snapshots with SHA-256 verification.
//! - **Replay & Simulation**: Recorded walks (JSON lines) and seeded random
//!   wanders for exercising a zone without leaving the desk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wildtales::session::{LogNotifier, LogSoundPlayer, ReplaySource, TrailSession};
//! use wildtales::storage::PoiStore;
//! use wildtales::tracker::VisitTracker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = PoiStore::open("./data")?;
//!     let tracker = VisitTracker::open(
//!         store,
//!         "forest",
//!         Box::new(LogNotifier),
//!         Box::new(LogSoundPlayer),
//!     )?;
//!
//!     let mut session = TrailSession::new(tracker);
//!     session
//!         .run(Box::new(ReplaySource::new("walk.jsonl", false)))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`tracker`] - The visit tracker engine, events, and sink traits
//! - [`poi`] - POI data model, wire records, and the per-POI state machine
//! - [`geo`] - WGS-84 coordinates and great-circle distance
//! - [`storage`] - Zone document persistence and backups
//! - [`session`] - Host loop, location sources, and CLI sinks
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input validation and sanitization utilities

pub mod config;
pub mod geo;
pub mod logutil;
pub mod metrics;
pub mod poi;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod validation;
