//! # Data Feeds
//!
//! The data-loading side of a replay: reading cached session archives and
//! turning their laps into per-driver sample streams for the engine.

/// Session archive format, the `RaceDataSource` trait and the file-backed source.
pub mod archive;
/// Driver stream construction and exclusion policy.
pub mod streams;

pub use archive::{ArchiveSource, ArchivedLap, CarDataPoint, FeedError, RaceDataSource, SessionArchive, SessionKey};
pub use streams::{build_driver_streams, Exclusion, ExclusionReason, StreamSet};
