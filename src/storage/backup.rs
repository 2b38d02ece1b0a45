//! Backup & recovery for trail data.
//!
//! Custom maps are the only copy of a family's badges and visited spots, so
//! the CLI can snapshot the whole data directory into a tar.gz with a
//! SHA-256 checksum, verify it later, and restore it elsewhere. A JSON index
//! next to the archives records what exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};

/// Metadata for one archived snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Unique backup identifier (timestamp-based)
    pub id: String,
    /// Human-readable name (optional)
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub backup_type: BackupType,
    /// SHA256 checksum for verification
    pub checksum: String,
    pub verified: bool,
    /// Path to the archive, relative to the backup directory
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupType {
    Manual,
    Automatic,
}

/// How many automatic snapshots to keep. Manual snapshots are kept forever
/// unless `keep_manual` is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub automatic_count: usize,
    pub keep_manual: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            automatic_count: 10,
            keep_manual: true,
        }
    }
}

pub struct BackupManager {
    /// Directory being snapshotted (the trail data dir)
    data_path: PathBuf,
    /// Where archives and the index live
    backup_path: PathBuf,
    retention: RetentionPolicy,
    backups: HashMap<String, BackupMetadata>,
}

impl BackupManager {
    pub fn new(
        data_path: PathBuf,
        backup_path: PathBuf,
        retention: RetentionPolicy,
    ) -> io::Result<Self> {
        fs::create_dir_all(&backup_path)?;

        let mut manager = Self {
            data_path,
            backup_path,
            retention,
            backups: HashMap::new(),
        };
        manager.load_index()?;
        Ok(manager)
    }

    fn index_path(&self) -> PathBuf {
        self.backup_path.join("backups.json")
    }

    fn load_index(&mut self) -> io::Result<()> {
        let path = self.index_path();
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            self.backups = serde_json::from_str(&contents)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }
        Ok(())
    }

    fn save_index(&self) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(&self.backups)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(self.index_path(), contents)?;
        Ok(())
    }

    /// Snapshot the data directory into a new archive.
    pub fn create_backup(
        &mut self,
        name: Option<String>,
        backup_type: BackupType,
    ) -> io::Result<BackupMetadata> {
        let timestamp = Utc::now();
        let id = format!("trail_{}", timestamp.format("%Y%m%d_%H%M%S_%3f"));
        // User-supplied names go through percent encoding before touching the
        // filesystem.
        let filename = match &name {
            Some(n) => format!("{}_{}.tar.gz", id, crate::validation::safe_filename(n)),
            None => format!("{}.tar.gz", id),
        };
        let backup_file = self.backup_path.join(&filename);

        log::info!("Creating backup: {} (type: {:?})", id, backup_type);

        let tar_gz = File::create(&backup_file)?;
        let enc = GzEncoder::new(tar_gz, Compression::default());
        let mut tar = Builder::new(enc);
        tar.append_dir_all("data", &self.data_path)?;

        // The archive must be fully flushed before the checksum is computed.
        let enc = tar.into_inner()?;
        enc.finish()?;

        let checksum = checksum_file(&backup_file)?;
        let size_bytes = fs::metadata(&backup_file)?.len();

        let metadata = BackupMetadata {
            id: id.clone(),
            name,
            created_at: timestamp,
            size_bytes,
            backup_type,
            checksum,
            verified: false,
            path: PathBuf::from(&filename),
        };

        self.backups.insert(id.clone(), metadata.clone());
        self.save_index()?;
        self.apply_retention()?;

        log::info!("Backup created: {} ({} bytes)", id, size_bytes);
        Ok(metadata)
    }

    /// Re-checksum an archive against its recorded value.
    pub fn verify_backup(&mut self, backup_id: &str) -> io::Result<bool> {
        let metadata = self
            .backups
            .get(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        let backup_file = self.backup_path.join(&metadata.path);
        if !backup_file.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Backup file missing"));
        }

        let valid = checksum_file(&backup_file)? == metadata.checksum;
        if valid {
            log::info!("Backup verification passed: {}", backup_id);
            if let Some(meta) = self.backups.get_mut(backup_id) {
                meta.verified = true;
            }
            self.save_index()?;
        } else {
            log::error!("Backup verification FAILED: {} (checksum mismatch)", backup_id);
        }
        Ok(valid)
    }

    /// Unpack an archive into `restore_path`, verifying the checksum first.
    pub fn restore_backup(&self, backup_id: &str, restore_path: &Path) -> io::Result<()> {
        let metadata = self
            .backups
            .get(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        let backup_file = self.backup_path.join(&metadata.path);
        if !backup_file.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Backup file missing"));
        }

        log::info!("Restoring backup: {} to {:?}", backup_id, restore_path);

        if checksum_file(&backup_file)? != metadata.checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Backup checksum mismatch",
            ));
        }

        fs::create_dir_all(restore_path)?;

        let tar_gz = File::open(&backup_file)?;
        let dec = GzDecoder::new(tar_gz);
        let mut archive = Archive::new(dec);
        archive.unpack(restore_path)?;

        log::info!("Backup restored: {}", backup_id);
        Ok(())
    }

    /// All known backups, newest first.
    pub fn list_backups(&self) -> Vec<BackupMetadata> {
        let mut backups: Vec<_> = self.backups.values().cloned().collect();
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        backups
    }

    pub fn get_backup(&self, backup_id: &str) -> Option<&BackupMetadata> {
        self.backups.get(backup_id)
    }

    /// Drop automatic snapshots beyond the retention count.
    fn apply_retention(&mut self) -> io::Result<()> {
        let mut automatic: Vec<_> = self
            .backups
            .values()
            .filter(|b| b.backup_type == BackupType::Automatic)
            .cloned()
            .collect();
        automatic.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        for stale in automatic.into_iter().skip(self.retention.automatic_count) {
            let file = self.backup_path.join(&stale.path);
            if file.exists() {
                fs::remove_file(&file)?;
            }
            self.backups.remove(&stale.id);
            log::info!("Pruned automatic backup: {}", stale.id);
        }
        self.save_index()
    }

    /// Delete a backup by id, honoring the keep-manual policy.
    pub fn delete_backup(&mut self, backup_id: &str) -> io::Result<()> {
        let metadata = self
            .backups
            .remove(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        if metadata.backup_type == BackupType::Manual && self.retention.keep_manual {
            self.backups.insert(backup_id.to_string(), metadata);
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Cannot delete manual backups (retention policy)",
            ));
        }

        let backup_file = self.backup_path.join(&metadata.path);
        if backup_file.exists() {
            fs::remove_file(&backup_file)?;
        }
        self.save_index()?;
        log::info!("Deleted backup: {}", backup_id);
        Ok(())
    }
}

fn checksum_file(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};

    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
