//! Configuration for the trail engine and CLI.
//!
//! TOML file with one section per concern. Values are validated on load;
//! `wildtales init` writes a default file worth reading before a first trip.
//!
//! ```toml
//! [app]
//! name = "WildTales"
//! default_zone = "forest"
//!
//! [tracker]
//! visit_radius_m = 50.0
//! breach_radius_m = 500.0
//! sound_volume = 0.8
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::tracker::{DEFAULT_BREACH_RADIUS_M, DEFAULT_VISIT_RADIUS_M};
use crate::validation::validate_zone_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    /// Zone used when the CLI is invoked without `--zone`.
    pub default_zone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "WildTales".to_string(),
            default_zone: "forest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Proximity threshold marking a POI visited, in meters.
    #[serde(default = "default_visit_radius")]
    pub visit_radius_m: f64,
    /// Distance past which a fence marker alerts, in meters.
    #[serde(default = "default_breach_radius")]
    pub breach_radius_m: f64,
    /// Playback volume for sound cues, 0.0..=1.0.
    #[serde(default = "default_sound_volume")]
    pub sound_volume: f32,
}

fn default_visit_radius() -> f64 {
    DEFAULT_VISIT_RADIUS_M
}

fn default_breach_radius() -> f64 {
    DEFAULT_BREACH_RADIUS_M
}

fn default_sound_volume() -> f32 {
    0.8
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            visit_radius_m: default_visit_radius(),
            breach_radius_m: default_breach_radius(),
            sound_volume: default_sound_volume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Where backup archives land. Kept outside `data_dir` so snapshots do
    /// not snowball by including each other.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// Cap on a zone document read into memory, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_backup_dir() -> String {
    "./backups".to_string()
}

fn default_max_file_bytes() -> u64 {
    4 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            backup_dir: default_backup_dir(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_zone_name(&self.app.default_zone)
            .map_err(|e| anyhow!("Invalid default_zone: {}", e))?;

        if self.tracker.visit_radius_m <= 0.0 {
            return Err(anyhow!("tracker.visit_radius_m must be positive"));
        }
        if self.tracker.breach_radius_m <= self.tracker.visit_radius_m {
            return Err(anyhow!(
                "tracker.breach_radius_m must be larger than visit_radius_m"
            ));
        }
        if !(0.0..=1.0).contains(&self.tracker.sound_volume) {
            return Err(anyhow!("tracker.sound_volume must be within 0.0..=1.0"));
        }
        if self.storage.max_file_bytes == 0 {
            return Err(anyhow!("storage.max_file_bytes must be nonzero"));
        }
        Ok(())
    }
}
