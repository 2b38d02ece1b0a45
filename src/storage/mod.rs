//! Zone document persistence.
//!
//! Each zone's POI list lives in a single JSON document at
//! `<data_dir>/zones/<zone>.json`, rewritten whole on every mutation. The
//! engine assumes a single writer per document; the exclusive file lock below
//! only guards against a second `wildtales` process stomping the same file
//! mid-rename. A missing or malformed document loads as an empty list so a
//! corrupt custom map degrades to "nothing here yet" instead of an error the
//! walker can do nothing about.

pub mod backup;

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::geo::Coordinate;
use crate::poi::{PoiCategory, PoiRecord, PointOfInterest, Quiz};
use crate::validation::{
    sanitize_display_text, secure_json_parse, secure_zone_path, validate_file_size,
    ValidationError, MAX_DISPLAY_TEXT,
};

/// Default cap on a zone document read into memory.
const DEFAULT_MAX_FILE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("point of interest not found: {0}")]
    NotFound(String),
}

/// File-backed store for zone POI documents.
pub struct PoiStore {
    data_dir: PathBuf,
    max_file_bytes: u64,
}

impl PoiStore {
    /// Open (creating directories as needed) a store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("zones"))?;
        Ok(Self {
            data_dir,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        })
    }

    pub fn with_max_file_bytes(mut self, max: u64) -> Self {
        self.max_file_bytes = max;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn zone_path(&self, zone: &str) -> Result<PathBuf, StoreError> {
        Ok(secure_zone_path(&self.data_dir, zone)?)
    }

    /// Load a zone's POI list. Missing, oversized, or malformed documents
    /// load as an empty list (logged); only unexpected I/O errors propagate.
    pub fn load(&self, zone: &str) -> Result<Vec<PointOfInterest>, StoreError> {
        let path = self.zone_path(zone)?;

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = validate_file_size(content.len() as u64, self.max_file_bytes) {
            warn!("zone {}: {}, treating as empty", zone, e);
            return Ok(Vec::new());
        }

        let records: Vec<PoiRecord> =
            match secure_json_parse(&content, self.max_file_bytes as usize) {
                Ok(records) => records,
                Err(_) => {
                    warn!("zone {}: malformed document, treating as empty", zone);
                    return Ok(Vec::new());
                }
            };

        Ok(records.into_iter().map(PoiRecord::into_domain).collect())
    }

    /// Overwrite a zone's document with the full POI list.
    pub fn save(&self, zone: &str, pois: &[PointOfInterest]) -> Result<(), StoreError> {
        let path = self.zone_path(zone)?;
        let records: Vec<PoiRecord> = pois.iter().map(PoiRecord::from_domain).collect();
        let content = serde_json::to_string_pretty(&records)?;
        write_file_locked(&path, &content)?;
        Ok(())
    }

    /// List zones that have a document on disk.
    pub fn zones(&self) -> Result<Vec<String>, StoreError> {
        let mut zones = Vec::new();
        let dir = self.data_dir.join("zones");
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if !stem.starts_with('.') {
                    zones.push(stem.to_string());
                }
            }
        }
        zones.sort();
        Ok(zones)
    }

    /// Add a user-placed POI to a zone (the custom-map flow). Display strings
    /// are sanitized, the id is a fresh UUID, and the document is persisted
    /// before returning.
    pub fn add_custom_poi(
        &self,
        zone: &str,
        name: &str,
        description: &str,
        coordinate: Coordinate,
        category: PoiCategory,
        quiz: Option<Quiz>,
    ) -> Result<PointOfInterest, StoreError> {
        let name = sanitize_display_text(name, MAX_DISPLAY_TEXT)?;
        let description = sanitize_display_text(description, MAX_DISPLAY_TEXT)?;

        let mut poi = PointOfInterest::new(
            Uuid::new_v4().to_string(),
            name,
            description,
            coordinate,
            category,
            zone,
        );
        if let Some(quiz) = quiz {
            if category.is_fence() || !quiz.is_well_formed() {
                warn!("discarding quiz on new poi in zone {}", zone);
            } else {
                poi = poi.with_quiz(quiz);
            }
        }

        let mut pois = self.load(zone)?;
        pois.push(poi.clone());
        self.save(zone, &pois)?;
        info!("added poi {} to zone {}", poi.id, zone);
        Ok(poi)
    }

    /// Remove a POI from a zone by id (the custom-map flow).
    pub fn remove_poi(&self, zone: &str, id: &str) -> Result<(), StoreError> {
        let mut pois = self.load(zone)?;
        let before = pois.len();
        pois.retain(|p| p.id != id);
        if pois.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.save(zone, &pois)?;
        info!("removed poi {} from zone {}", id, zone);
        Ok(())
    }

    /// Clear all visit and quiz progress in a zone. This is the one sanctioned
    /// way the sticky flags go backwards: the walker starting a map over.
    pub fn reset_zone(&self, zone: &str) -> Result<Vec<PointOfInterest>, StoreError> {
        let mut pois = self.load(zone)?;
        for poi in &mut pois {
            poi.visited = false;
            poi.visited_at = None;
            poi.quiz_completed = false;
        }
        self.save(zone, &pois)?;
        info!("reset progress for zone {}", zone);
        Ok(pois)
    }
}

/// Starter content written by `wildtales init`: a small demo zone with one
/// quiz POI and a fence marker, enough to replay or wander against.
pub fn starter_zone_pois(zone: &str) -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new(
            "old-oak",
            "Old Oak",
            "The biggest oak on the trail. Listen for woodpeckers!",
            Coordinate::new(57.68905, 11.97560),
            PoiCategory::Plant,
            zone,
        )
        .with_quiz(Quiz::new(
            "How old can an oak tree get?",
            vec![
                "About 100 years".into(),
                "More than 500 years".into(),
                "Only 50 years".into(),
            ],
            1,
        )),
        PointOfInterest::new(
            "ant-hill",
            "Giant Ant Hill",
            "Thousands of ants live here. Can you spot the queen's tower?",
            Coordinate::new(57.68951, 11.97702),
            PoiCategory::Animal,
            zone,
        ),
        PointOfInterest::new(
            "lookout",
            "Lookout Rock",
            "Climb carefully and wave to the lake.",
            Coordinate::new(57.69012, 11.97433),
            PoiCategory::Location,
            zone,
        ),
        PointOfInterest::new(
            "trailhead-fence",
            "Trailhead",
            "Stay close to the trailhead so a grown-up can see you.",
            Coordinate::new(57.68890, 11.97510),
            PoiCategory::Fence,
            zone,
        ),
    ]
}

/// Write content to a file atomically under an exclusive lock: lock the
/// destination, write a temp file in the same directory, fsync, rename over
/// the destination, then fsync the directory (best-effort).
fn write_file_locked(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;

    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("zone.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    fs::rename(&tmp_path, path)?;

    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    drop(lock_file);
    Ok(())
}
