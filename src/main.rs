//! Binary entrypoint for the WildTales trail CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and a demo zone document
//! - `status` - print per-zone trail progress
//! - `replay --file <walk.jsonl> [--zone Z] [--paced]` - feed a recorded walk
//! - `wander [--zone Z] [--steps N] [--seed S] [--start LAT,LON]` - simulated walk
//! - `backup [--name N]` / `backups` / `restore <id> [--dest DIR]` - trail data snapshots
//!
//! See the library crate docs for module-level details: `wildtales::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;

use wildtales::config::Config;
use wildtales::session::{
    parse_start_coordinate, LogNotifier, LogSoundPlayer, ReplaySource, TrailSession,
    WanderSource, ZoneProgress,
};
use wildtales::storage::backup::{BackupManager, BackupType, RetentionPolicy};
use wildtales::storage::{starter_zone_pois, PoiStore};
use wildtales::tracker::VisitTracker;

#[derive(Parser)]
#[command(name = "wildtales")]
#[command(about = "Trail engine CLI for the WildTales outdoor exploration app")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a starter configuration and demo zone
    Init,
    /// Show trail progress per zone
    Status,
    /// Replay a recorded walk (JSON lines of position samples)
    Replay {
        /// Path to the samples file
        #[arg(short, long)]
        file: String,
        /// Zone to track against (defaults to the configured zone)
        #[arg(short, long)]
        zone: Option<String>,
        /// Honor recordedAt gaps between samples instead of replaying flat out
        #[arg(long)]
        paced: bool,
    },
    /// Simulate a random walk through a zone
    Wander {
        /// Zone to track against (defaults to the configured zone)
        #[arg(short, long)]
        zone: Option<String>,
        /// Number of steps to take
        #[arg(short, long, default_value_t = 200)]
        steps: u32,
        /// RNG seed; omit for a fresh walk each run
        #[arg(long)]
        seed: Option<u64>,
        /// Starting coordinate as LAT,LON (defaults to the zone's first POI)
        #[arg(long)]
        start: Option<String>,
    },
    /// Create a backup of the trail data directory
    Backup {
        /// Human-readable backup name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List known backups
    Backups,
    /// Restore a backup into a directory
    Restore {
        /// Backup id (see `backups`)
        id: String,
        /// Destination directory
        #[arg(long, default_value = "./restored")]
        dest: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (Init writes the default later).
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            if tokio::fs::metadata(&cli.config).await.is_ok() {
                println!("Config file {} already exists, leaving it alone.", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                println!("Wrote {}.", cli.config);
            }

            let config = Config::load(&cli.config).await?;
            let store = open_store(&config)?;
            let zone = &config.app.default_zone;
            if store.load(zone)?.is_empty() {
                store.save(zone, &starter_zone_pois(zone))?;
                println!("Seeded demo zone '{}' under {}.", zone, config.storage.data_dir);
            } else {
                println!("Zone '{}' already has data, leaving it alone.", zone);
            }
            println!("Try: wildtales wander --steps 100");
        }
        Commands::Status => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let store = open_store(&config)?;
            let zones = store.zones()?;
            if zones.is_empty() {
                println!("No zones found under {}. Run `wildtales init` first.", config.storage.data_dir);
                return Ok(());
            }
            println!("{:<20} {:>8} {:>8} {:>8} {:>8}", "ZONE", "POIS", "VISITED", "QUIZZES", "DONE");
            for zone in zones {
                let pois = store.load(&zone)?;
                let p = ZoneProgress::from_pois(&pois);
                println!(
                    "{:<20} {:>8} {:>8} {:>8} {:>8}",
                    zone, p.total, p.visited, p.quizzes, p.quizzes_completed
                );
            }
        }
        Commands::Replay { file, zone, paced } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let zone = zone.unwrap_or_else(|| config.app.default_zone.clone());
            let mut session = open_session(&config, &zone)?;
            session.run(Box::new(ReplaySource::new(file, paced))).await?;
        }
        Commands::Wander {
            zone,
            steps,
            seed,
            start,
        } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let zone = zone.unwrap_or_else(|| config.app.default_zone.clone());
            let session = open_session(&config, &zone)?;

            let start = match start {
                Some(value) => parse_start_coordinate(&value)?,
                None => session
                    .tracker()
                    .pois()
                    .first()
                    .map(|p| p.coordinate)
                    .ok_or_else(|| anyhow!("zone '{}' is empty; add POIs or pass --start", zone))?,
            };
            let seed = seed.unwrap_or_else(rand::random);
            info!("wandering zone {} with seed {}", zone, seed);

            let mut session = session;
            session
                .run(Box::new(WanderSource::new(start, steps, seed)))
                .await?;
        }
        Commands::Backup { name } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let mut manager = open_backup_manager(&config)?;
            let meta = manager.create_backup(name, BackupType::Manual)?;
            println!("Created backup {} ({} bytes)", meta.id, meta.size_bytes);
        }
        Commands::Backups => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let manager = open_backup_manager(&config)?;
            let backups = manager.list_backups();
            if backups.is_empty() {
                println!("No backups yet.");
            }
            for meta in backups {
                println!(
                    "{}  {}  {:>10} bytes  {}",
                    meta.id,
                    meta.created_at.format("%Y-%m-%d %H:%M:%S"),
                    meta.size_bytes,
                    meta.name.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Restore { id, dest } => {
            let config = resolve_config(pre_config, &cli.config).await?;
            let manager = open_backup_manager(&config)?;
            manager.restore_backup(&id, std::path::Path::new(&dest))?;
            println!("Restored {} into {}", id, dest);
        }
    }

    Ok(())
}

/// Reuse the early-loaded config, or load again so the real error surfaces.
async fn resolve_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    match pre_config {
        Some(config) => Ok(config),
        None => Config::load(path).await,
    }
}

fn open_store(config: &Config) -> Result<PoiStore> {
    Ok(PoiStore::open(&config.storage.data_dir)?
        .with_max_file_bytes(config.storage.max_file_bytes))
}

fn open_session(config: &Config, zone: &str) -> Result<TrailSession> {
    let store = open_store(config)?;
    let tracker = VisitTracker::open(store, zone, Box::new(LogNotifier), Box::new(LogSoundPlayer))?
        .with_radii(config.tracker.visit_radius_m, config.tracker.breach_radius_m)
        .with_sound_volume(config.tracker.sound_volume);
    Ok(TrailSession::new(tracker))
}

fn open_backup_manager(config: &Config) -> Result<BackupManager> {
    Ok(BackupManager::new(
        config.storage.data_dir.clone().into(),
        config.storage.backup_dir.clone().into(),
        RetentionPolicy::default(),
    )?)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if verbosity == 0 {
        if let Some(cfg) = config {
            if let Ok(level) = cfg.logging.level.parse() {
                builder.filter_level(level);
            }
        }
    }

    if let Some(file) = config.as_ref().and_then(|c| c.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            let write_mutex = mutex.clone();

            // When stdout is a terminal, mirror log lines to the console too.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)?;
                }
                Ok(())
            });
        }
    }

    let _ = builder.try_init();
}
