use crate::replay::distance::{self, DistanceStep};
use crate::replay::lap_tracker::{LapTracker, LapTransition};
use crate::replay::sample::Sample;

/// Mutable race state of one driver within one session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverRaceState {
    cumulative_km: f64,
    lap: LapTracker,
}

/// Everything one sample changed, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleUpdate {
    pub step: DistanceStep,
    pub transition: LapTransition,
}

impl DriverRaceState {
    pub fn cumulative_km(&self) -> f64 {
        self.cumulative_km
    }

    pub fn current_lap(&self) -> Option<u32> {
        self.lap.current_lap()
    }

    pub fn lap_km(&self) -> f64 {
        self.lap.lap_km()
    }

    /// Runs the distance integrator, then the lap tracker, for one sample.
    pub fn apply(&mut self, sample: &Sample) -> SampleUpdate {
        let step = distance::integrate(self.cumulative_km, sample);
        self.cumulative_km = step.cumulative_km;
        let transition = self.lap.track(sample.lap_number(), step.delta_km);
        SampleUpdate { step, transition }
    }
}
