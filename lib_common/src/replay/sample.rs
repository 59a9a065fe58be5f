//! # Samples and Driver Streams
//!
//! A `Sample` is one telemetry point (speed, time since the previous point,
//! lap number). Every field is optional because historical feeds routinely
//! drop values; a missing value is never encoded as a sentinel.
//!
//! Samples can only be created through [`Sample::new`], which rejects values
//! that cannot occur physically. Once a `DriverStream` exists, every sample in
//! it is known to be valid and the engine never has to re-check.

use crate::replay::error::ReplayError;

/// One validated telemetry point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    speed_kmh: Option<f64>,
    dt_seconds: Option<f64>,
    lap_number: Option<u32>,
}

impl Sample {
    /// Builds a sample, rejecting negative or non-finite speed and time deltas
    /// and lap number zero.
    pub fn new(
        speed_kmh: Option<f64>,
        dt_seconds: Option<f64>,
        lap_number: Option<u32>,
    ) -> Result<Self, ReplayError> {
        if let Some(speed) = speed_kmh {
            check_non_negative("speed_kmh", speed)?;
        }
        if let Some(dt) = dt_seconds {
            check_non_negative("dt_seconds", dt)?;
        }
        if lap_number == Some(0) {
            return Err(ReplayError::InvalidSample {
                field: "lap_number",
                value: 0.0,
                reason: "laps are numbered from 1",
            });
        }
        Ok(Self {
            speed_kmh,
            dt_seconds,
            lap_number,
        })
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_kmh
    }

    pub fn dt_seconds(&self) -> Option<f64> {
        self.dt_seconds
    }

    pub fn lap_number(&self) -> Option<u32> {
        self.lap_number
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ReplayError> {
    if !value.is_finite() {
        return Err(ReplayError::InvalidSample {
            field,
            value,
            reason: "value is not finite",
        });
    }
    if value < 0.0 {
        return Err(ReplayError::InvalidSample {
            field,
            value,
            reason: "value is negative",
        });
    }
    Ok(())
}

/// The ordered, immutable sample sequence of one driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverStream {
    driver: String,
    samples: Vec<Sample>,
}

impl DriverStream {
    pub fn new(driver: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            driver: driver.into(),
            samples,
        }
    }

    /// Builds a stream from raw `(speed, dt, lap)` tuples.
    ///
    /// The first invalid tuple fails the whole stream; the error names the
    /// driver and the offending index so the caller can log and exclude it.
    pub fn from_raw<I>(driver: impl Into<String>, raw: I) -> Result<Self, ReplayError>
    where
        I: IntoIterator<Item = (Option<f64>, Option<f64>, Option<u32>)>,
    {
        let driver = driver.into();
        let samples = raw
            .into_iter()
            .enumerate()
            .map(|(index, (speed, dt, lap))| {
                Sample::new(speed, dt, lap).map_err(|e| e.in_stream(&driver, index))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { driver, samples })
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_accepted() {
        let sample = Sample::new(None, None, None).unwrap();
        assert_eq!(sample.speed_kmh(), None);
        assert_eq!(sample.dt_seconds(), None);
        assert_eq!(sample.lap_number(), None);
    }

    #[test]
    fn negative_speed_is_rejected() {
        let err = Sample::new(Some(-1.0), Some(0.2), Some(1)).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::InvalidSample { field: "speed_kmh", .. }
        ));
    }

    #[test]
    fn negative_dt_and_nan_are_rejected() {
        assert!(Sample::new(Some(100.0), Some(-0.1), None).is_err());
        assert!(Sample::new(Some(f64::NAN), Some(0.1), None).is_err());
        assert!(Sample::new(Some(100.0), Some(f64::INFINITY), None).is_err());
    }

    #[test]
    fn lap_zero_is_rejected() {
        assert!(Sample::new(Some(100.0), Some(0.0), Some(0)).is_err());
    }

    #[test]
    fn from_raw_reports_driver_and_index() {
        let err = DriverStream::from_raw(
            "HAM",
            vec![
                (Some(100.0), Some(0.0), Some(1)),
                (Some(-5.0), Some(0.1), Some(1)),
            ],
        )
        .unwrap_err();
        match err {
            ReplayError::InvalidStream { driver, index, .. } => {
                assert_eq!(driver, "HAM");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
