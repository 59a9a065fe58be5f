//! # Configuration
//!
//! Server settings are merged in layers, later layers winning key by key:
//!
//! 1. built-in defaults;
//! 2. the JSON config file (`server_replay.conf` unless `--config-path` or
//!    `REPLAY_CONFIG_PATH` says otherwise);
//! 3. `REPLAY_*` environment variables and command line flags.
//!
//! The merged [`Config`] is then resolved into a [`Settings`] value with every
//! field concrete. The qualifying table can only come from the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feeds::SessionKey;
use crate::prediction::{default_grid, QualifyingEntry};
use crate::replay::InterleaveMode;

pub const DEFAULT_CONFIG_FILE: &str = "server_replay.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Race telemetry replay WebSocket server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "REPLAY_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "REPLAY_HOST", help = "Interface to bind.")]
    pub host: Option<String>,

    #[clap(long, env = "REPLAY_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "REPLAY_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "REPLAY_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "REPLAY_LOG_RETENTION", help = "Number of rolled log files to keep.")]
    pub log_retention: Option<usize>,

    #[clap(long, env = "REPLAY_CACHE_DIR", help = "Directory holding the session archives.")]
    pub cache_dir: Option<PathBuf>,

    #[clap(long, env = "REPLAY_RACE_YEAR", help = "Season of the replayed session.")]
    pub race_year: Option<u16>,

    #[clap(long, env = "REPLAY_RACE_EVENT", help = "Event name of the replayed session.")]
    pub race_event: Option<String>,

    #[clap(long, env = "REPLAY_RACE_SESSION", help = "Session identifier of the replayed session (R, Q, ...).")]
    pub race_session: Option<String>,

    #[clap(long, env = "REPLAY_PREDICTION_YEAR", help = "Season of the reference session the lap-time model learns from.")]
    pub prediction_year: Option<u16>,

    #[clap(long, env = "REPLAY_PREDICTION_EVENT", help = "Event name of the reference session.")]
    pub prediction_event: Option<String>,

    #[clap(long, env = "REPLAY_PREDICTION_SESSION", help = "Session identifier of the reference session.")]
    pub prediction_session: Option<String>,

    #[clap(long, env = "REPLAY_PACING_MS", help = "Delay in milliseconds between two telemetry records.")]
    pub pacing_ms: Option<u64>,

    #[clap(long, env = "REPLAY_INTERLEAVE", help = "Interleave mode: round-robin or chronological.")]
    pub interleave: Option<InterleaveMode>,

    #[clap(skip)]
    pub qualifying: Option<Vec<QualifyingEntry>>,
}

impl Config {
    /// `other` overrides `self` for every `Some` value.
    pub fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            host: other.host.or(self.host),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            log_retention: other.log_retention.or(self.log_retention),
            cache_dir: other.cache_dir.or(self.cache_dir),
            race_year: other.race_year.or(self.race_year),
            race_event: other.race_event.or(self.race_event),
            race_session: other.race_session.or(self.race_session),
            prediction_year: other.prediction_year.or(self.prediction_year),
            prediction_event: other.prediction_event.or(self.prediction_event),
            prediction_session: other.prediction_session.or(self.prediction_session),
            pacing_ms: other.pacing_ms.or(self.pacing_ms),
            interleave: other.interleave.or(self.interleave),
            qualifying: other.qualifying.or(self.qualifying),
        }
    }

    pub fn defaults() -> Config {
        Config {
            port: Some(8765),
            host: Some("127.0.0.1".to_string()),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            log_retention: Some(7),
            cache_dir: Some(PathBuf::from("./cache")),
            race_year: Some(2023),
            race_event: Some("Monaco".to_string()),
            race_session: Some("R".to_string()),
            prediction_year: Some(2024),
            prediction_event: Some("Monaco".to_string()),
            prediction_session: Some("R".to_string()),
            pacing_ms: Some(2),
            interleave: Some(InterleaveMode::RoundRobin),
            ..Default::default()
        }
    }

    /// Reads a JSON config file. A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Option<Config>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub config_path: PathBuf,
    /// `false` when the config file did not exist.
    pub config_file_loaded: bool,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub log_retention: usize,
    pub cache_dir: PathBuf,
    pub race: SessionKey,
    pub reference: SessionKey,
    pub pacing: Duration,
    pub interleave: InterleaveMode,
    pub qualifying: Vec<QualifyingEntry>,
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses the process arguments and environment and resolves all layers.
pub fn load_settings() -> Result<Settings, ConfigError> {
    resolve(Config::parse())
}

/// Resolves the layers given an already parsed CLI/env layer.
pub fn resolve(cli: Config) -> Result<Settings, ConfigError> {
    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut merged = Config::defaults();
    let file = Config::from_file(&config_path)?;
    let config_file_loaded = file.is_some();
    if let Some(file) = file {
        merged = merged.merge(file);
    }
    merged = merged.merge(cli);

    let qualifying = match merged.qualifying {
        Some(grid) if !grid.is_empty() => grid,
        _ => default_grid(),
    };

    Ok(Settings {
        host: merged.host.unwrap_or_else(|| "127.0.0.1".to_string()),
        port: merged.port.unwrap_or(8765),
        config_path,
        config_file_loaded,
        log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
        log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
        log_retention: merged.log_retention.unwrap_or(7),
        cache_dir: merged.cache_dir.unwrap_or_else(|| PathBuf::from("./cache")),
        race: SessionKey::new(
            merged.race_year.unwrap_or(2023),
            merged.race_event.unwrap_or_else(|| "Monaco".to_string()),
            merged.race_session.unwrap_or_else(|| "R".to_string()),
        ),
        reference: SessionKey::new(
            merged.prediction_year.unwrap_or(2024),
            merged.prediction_event.unwrap_or_else(|| "Monaco".to_string()),
            merged.prediction_session.unwrap_or_else(|| "R".to_string()),
        ),
        pacing: Duration::from_millis(merged.pacing_ms.unwrap_or(2)),
        interleave: merged.interleave.unwrap_or_default(),
        qualifying,
    })
}
