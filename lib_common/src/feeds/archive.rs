//! # Session Archives
//!
//! A session archive is the locally cached copy of one historical session:
//! every recorded lap with its lap time and car telemetry. Archives live as
//! JSON files in a cache directory that is handed to [`ArchiveSource`] by the
//! caller; nothing here reads global state.
//!
//! File name: `<year>_<event>_<session>.json`, all lower-case, whitespace in
//! the event replaced by `_` (e.g. `2023_monaco_r.json`). Keys differing only
//! in case name the same file.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("session archive not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read session archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session archive {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("archive {} holds {found}, expected {expected}", .path.display())]
    WrongSession {
        path: PathBuf,
        expected: SessionKey,
        found: SessionKey,
    },
}

/// Identifies one session of one event, e.g. `2023 Monaco R`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub year: u16,
    pub event: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(year: u16, event: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            year,
            event: event.into(),
            session: session.into(),
        }
    }

    pub fn file_name(&self) -> String {
        let event: String = self
            .event
            .trim()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        let session = self.session.trim().to_lowercase();
        format!("{}_{}_{}.json", self.year, event, session)
    }

    fn matches(&self, other: &SessionKey) -> bool {
        self.year == other.year
            && self.event.trim().eq_ignore_ascii_case(other.event.trim())
            && self.session.trim().eq_ignore_ascii_case(other.session.trim())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.event, self.session)
    }
}

/// One car-data point as recorded by the timing feed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarDataPoint {
    /// Seconds since the session clock started.
    pub session_time_s: Option<f64>,
    /// km/h
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArchivedLap {
    pub driver: String,
    pub lap_number: Option<u32>,
    pub lap_time_s: Option<f64>,
    #[serde(default)]
    pub car_data: Vec<CarDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionArchive {
    #[serde(flatten)]
    pub key: SessionKey,
    #[serde(default)]
    pub laps: Vec<ArchivedLap>,
}

impl SessionArchive {
    /// Driver codes in order of first appearance.
    pub fn driver_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for lap in &self.laps {
            if !codes.contains(&lap.driver.as_str()) {
                codes.push(&lap.driver);
            }
        }
        codes
    }

    /// Laps of one driver, in archive order.
    pub fn laps_of<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a ArchivedLap> + 'a {
        self.laps.iter().filter(move |lap| lap.driver == driver)
    }

    /// Every recorded lap time, as `(driver code, seconds)`.
    pub fn lap_times(&self) -> Vec<(&str, f64)> {
        self.laps
            .iter()
            .filter_map(|lap| lap.lap_time_s.map(|secs| (lap.driver.as_str(), secs)))
            .collect()
    }
}

/// Where sessions come from. Implementations may block; callers on an async
/// runtime are expected to use `spawn_blocking`.
pub trait RaceDataSource: Send + Sync {
    fn load_session(&self, key: &SessionKey) -> Result<SessionArchive, FeedError>;
}

/// Reads archives from a cache directory.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    cache_dir: PathBuf,
}

impl ArchiveSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.cache_dir.join(key.file_name())
    }

    /// Writes an archive where `load_session` will look for it.
    pub fn store(&self, archive: &SessionArchive) -> Result<PathBuf, FeedError> {
        let path = self.path_for(&archive.key);
        fs::create_dir_all(&self.cache_dir).map_err(|source| FeedError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;
        let body = serde_json::to_vec_pretty(archive).map_err(|source| FeedError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, body).map_err(|source| FeedError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl RaceDataSource for ArchiveSource {
    fn load_session(&self, key: &SessionKey) -> Result<SessionArchive, FeedError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(FeedError::NotFound { path });
        }

        let body = fs::read(&path).map_err(|source| FeedError::Io {
            path: path.clone(),
            source,
        })?;
        let archive: SessionArchive =
            serde_json::from_slice(&body).map_err(|source| FeedError::Parse {
                path: path.clone(),
                source,
            })?;

        if !archive.key.matches(key) {
            return Err(FeedError::WrongSession {
                path,
                expected: key.clone(),
                found: archive.key,
            });
        }

        tracing::info!(session = %key, laps = archive.laps.len(), "session archive loaded");
        Ok(archive)
    }
}
