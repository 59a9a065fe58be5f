//! # Replay Engine
//!
//! Turns per-driver historical telemetry into one live-looking feed. The
//! pieces, leaves first:
//!
//! - **`distance`**: speed × time-delta integration into kilometres.
//! - **`lap_tracker`**: lap transitions and in-lap distance.
//! - **`ranking`**: live order from lap and in-lap distance.
//! - **`interleaver`**: merges all driver streams and drives the three above
//!   once per emitted sample.
//! - **`record`**: the outbound record types.
//!
//! Nothing in here performs I/O or knows about time; the `session` module
//! paces and transports what the interleaver yields.

#![forbid(unsafe_code)]

/// Distance integration for one sample.
pub mod distance;
/// Engine error type.
pub mod error;
/// Round-robin and chronological stream merging.
pub mod interleaver;
/// Lap transitions and in-lap distance.
pub mod lap_tracker;
/// Live race order.
pub mod ranking;
/// Records published to consumers.
pub mod record;
/// Validated samples and per-driver streams.
pub mod sample;
/// Per-driver mutable race state.
pub mod state;

// --- Public API Re-exports ---
pub use error::ReplayError;
pub use interleaver::{InterleaveMode, InterleaveState, Interleaver};
pub use lap_tracker::{LapTracker, LapTransition};
pub use ranking::RankingSnapshot;
pub use record::{PredictedLap, PredictionSet, ServerMessage, TelemetryRecord};
pub use sample::{DriverStream, Sample};
pub use state::{DriverRaceState, SampleUpdate};
