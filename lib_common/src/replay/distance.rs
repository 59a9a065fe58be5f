//! # Distance Integrator
//!
//! Converts a raw `(speed, dt)` pair into travelled distance. Speeds are in
//! km/h and time deltas in seconds, so one sample contributes
//! `speed * dt / 3600` kilometres.

use crate::replay::sample::Sample;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Result of integrating one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStep {
    pub delta_km: f64,
    pub cumulative_km: f64,
}

/// Integrates one sample on top of `previous_km`.
///
/// A missing speed or time delta counts as zero: the driver advances in time
/// but not in distance. Samples are validated on construction, so the delta is
/// never negative and the cumulative distance never decreases.
///
/// Both values saturate at `f64::MAX`; an overflow to infinity would not
/// survive JSON encoding.
pub fn integrate(previous_km: f64, sample: &Sample) -> DistanceStep {
    let speed = sample.speed_kmh().unwrap_or(0.0);
    let dt = sample.dt_seconds().unwrap_or(0.0);
    let delta_km = (speed * dt / SECONDS_PER_HOUR).min(f64::MAX);
    DistanceStep {
        delta_km,
        cumulative_km: (previous_km + delta_km).min(f64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_second_at_100_kmh() {
        let sample = Sample::new(Some(100.0), Some(1.0), Some(1)).unwrap();
        let step = integrate(0.0, &sample);
        assert!((step.delta_km - 0.027_777_8).abs() < 1e-6);
        assert_eq!(step.cumulative_km, step.delta_km);
    }

    #[test]
    fn missing_speed_adds_nothing() {
        let sample = Sample::new(None, Some(0.25), Some(3)).unwrap();
        let step = integrate(12.5, &sample);
        assert_eq!(step.delta_km, 0.0);
        assert_eq!(step.cumulative_km, 12.5);
    }

    #[test]
    fn missing_dt_adds_nothing() {
        let sample = Sample::new(Some(310.0), None, None).unwrap();
        assert_eq!(integrate(1.0, &sample).cumulative_km, 1.0);
    }

    #[test]
    fn huge_inputs_saturate_instead_of_overflowing() {
        let sample = Sample::new(Some(1e300), Some(1e10), Some(1)).unwrap();
        let first = integrate(0.0, &sample);
        assert!(first.delta_km.is_finite());
        assert_eq!(first.cumulative_km, f64::MAX);

        let second = integrate(first.cumulative_km, &sample);
        assert!(second.cumulative_km.is_finite());
        assert!(second.cumulative_km >= first.cumulative_km);
        assert_ne!(serde_json::to_string(&second.cumulative_km).unwrap(), "null");
    }

    proptest! {
        #[test]
        fn cumulative_distance_never_decreases(
            previous in 0.0f64..10_000.0,
            speed in proptest::option::of(0.0f64..400.0),
            dt in proptest::option::of(0.0f64..5.0),
        ) {
            let sample = Sample::new(speed, dt, None).unwrap();
            let step = integrate(previous, &sample);
            prop_assert!(step.delta_km >= 0.0);
            prop_assert!(step.cumulative_km >= previous);
        }
    }
}
