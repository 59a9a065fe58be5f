//! Builds one [`DriverStream`] per driver from a session archive.
//!
//! Laps are concatenated in archive order and each sample's `dt` is the
//! session-clock difference to the previous sample of the same driver. A
//! driver with no telemetry at all, or with a sample the engine cannot accept,
//! is left out and reported in [`StreamSet::excluded`].

use crate::feeds::archive::SessionArchive;
use crate::replay::{DriverStream, ReplayError};

#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    NoTelemetry,
    InvalidSample(ReplayError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub driver: String,
    pub reason: ExclusionReason,
}

/// The streams of one session plus the drivers that were left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamSet {
    pub streams: Vec<DriverStream>,
    pub excluded: Vec<Exclusion>,
}

impl StreamSet {
    pub fn sample_count(&self) -> usize {
        self.streams.iter().map(DriverStream::len).sum()
    }
}

pub fn build_driver_streams(archive: &SessionArchive) -> StreamSet {
    let mut set = StreamSet::default();

    for driver in archive.driver_codes() {
        let mut raw = Vec::new();
        let mut previous_time: Option<Option<f64>> = None;

        for lap in archive.laps_of(driver) {
            for point in &lap.car_data {
                let dt = match previous_time {
                    None => Some(0.0),
                    Some(previous) => match (previous, point.session_time_s) {
                        (Some(before), Some(now)) => Some(now - before),
                        _ => None,
                    },
                };
                previous_time = Some(point.session_time_s);
                raw.push((point.speed, dt, lap.lap_number));
            }
        }

        if raw.is_empty() {
            tracing::warn!(driver, "no telemetry recorded, driver excluded");
            set.excluded.push(Exclusion {
                driver: driver.to_string(),
                reason: ExclusionReason::NoTelemetry,
            });
            continue;
        }

        match DriverStream::from_raw(driver, raw) {
            Ok(stream) => set.streams.push(stream),
            Err(e) => {
                tracing::warn!(driver, error = %e, "invalid telemetry, driver excluded");
                set.excluded.push(Exclusion {
                    driver: driver.to_string(),
                    reason: ExclusionReason::InvalidSample(e),
                });
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::archive::{ArchivedLap, CarDataPoint, SessionKey};

    fn point(t: Option<f64>, speed: Option<f64>) -> CarDataPoint {
        CarDataPoint {
            session_time_s: t,
            speed,
        }
    }

    fn lap(driver: &str, lap_number: u32, car_data: Vec<CarDataPoint>) -> ArchivedLap {
        ArchivedLap {
            driver: driver.to_string(),
            lap_number: Some(lap_number),
            lap_time_s: None,
            car_data,
        }
    }

    fn archive(laps: Vec<ArchivedLap>) -> SessionArchive {
        SessionArchive {
            key: SessionKey::new(2023, "Monaco", "R"),
            laps,
        }
    }

    #[test]
    fn concatenates_laps_and_computes_dt() {
        let set = build_driver_streams(&archive(vec![
            lap("VER", 1, vec![point(Some(10.0), Some(100.0)), point(Some(10.5), Some(110.0))]),
            lap("VER", 2, vec![point(Some(11.5), Some(120.0))]),
        ]));
        assert!(set.excluded.is_empty());
        let samples = set.streams[0].samples();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].dt_seconds(), Some(0.0));
        assert_eq!(samples[1].dt_seconds(), Some(0.5));
        assert_eq!(samples[2].dt_seconds(), Some(1.0));
        assert_eq!(samples[2].lap_number(), Some(2));
    }

    #[test]
    fn missing_time_gives_missing_dt() {
        let set = build_driver_streams(&archive(vec![lap(
            "ALO",
            1,
            vec![point(Some(1.0), Some(90.0)), point(None, Some(95.0)), point(Some(2.0), None)],
        )]));
        let samples = set.streams[0].samples();
        assert_eq!(samples[1].dt_seconds(), None);
        assert_eq!(samples[2].dt_seconds(), None);
        assert_eq!(samples[2].speed_kmh(), None);
    }

    #[test]
    fn drivers_keep_first_appearance_order() {
        let set = build_driver_streams(&archive(vec![
            lap("RUS", 1, vec![point(Some(1.0), Some(1.0))]),
            lap("HAM", 1, vec![point(Some(1.0), Some(1.0))]),
            lap("RUS", 2, vec![point(Some(2.0), Some(1.0))]),
        ]));
        let drivers: Vec<_> = set.streams.iter().map(|s| s.driver()).collect();
        assert_eq!(drivers, vec!["RUS", "HAM"]);
        assert_eq!(set.sample_count(), 3);
    }

    #[test]
    fn driver_without_telemetry_is_excluded() {
        let set = build_driver_streams(&archive(vec![
            lap("STR", 1, Vec::new()),
            lap("GAS", 1, vec![point(Some(1.0), Some(200.0))]),
        ]));
        assert_eq!(set.streams.len(), 1);
        assert_eq!(set.excluded[0].driver, "STR");
        assert_eq!(set.excluded[0].reason, ExclusionReason::NoTelemetry);
    }

    #[test]
    fn clock_running_backwards_excludes_only_that_driver() {
        let set = build_driver_streams(&archive(vec![
            lap("TSU", 1, vec![point(Some(5.0), Some(200.0)), point(Some(4.0), Some(200.0))]),
            lap("ALB", 1, vec![point(Some(5.0), Some(200.0))]),
        ]));
        assert_eq!(set.streams.len(), 1);
        assert_eq!(set.streams[0].driver(), "ALB");
        assert!(matches!(
            set.excluded[0].reason,
            ExclusionReason::InvalidSample(ReplayError::InvalidStream { index: 1, .. })
        ));
    }
}
