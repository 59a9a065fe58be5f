use thiserror::Error;

/// Errors raised while building or configuring the replay engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// A sample carried a physically impossible value. The owning driver is
    /// excluded from the session; nothing else is affected.
    #[error("invalid sample: {field} = {value} ({reason})")]
    InvalidSample {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A sample in a named driver stream failed validation.
    #[error("driver {driver}, sample #{index}: {source}")]
    InvalidStream {
        driver: String,
        index: usize,
        #[source]
        source: Box<ReplayError>,
    },

    #[error("unknown interleave mode '{0}' (expected 'round-robin' or 'chronological')")]
    UnknownInterleaveMode(String),
}

impl ReplayError {
    /// Attaches the driver code and sample index to a sample-level error.
    pub fn in_stream(self, driver: &str, index: usize) -> Self {
        ReplayError::InvalidStream {
            driver: driver.to_string(),
            index,
            source: Box::new(self),
        }
    }
}
