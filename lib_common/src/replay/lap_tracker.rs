//! # Lap Tracker
//!
//! Follows lap-number transitions per driver and keeps the in-lap distance
//! used by the ranking. Lap numbers only move forward: a sample reporting an
//! older lap than the one already tracked is stale data and is ignored.

/// What a sample did to the tracked lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapTransition {
    /// The sample carried no lap number.
    Untracked,
    /// A new (higher, or first) lap began; in-lap distance was reset.
    Started(u32),
    /// Same lap as before.
    Continued,
    /// Older than the tracked lap; dropped without touching state.
    Stale { reported: u32, current: u32 },
}

/// Per-driver lap bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LapTracker {
    current_lap: Option<u32>,
    lap_km: f64,
}

impl LapTracker {
    pub fn current_lap(&self) -> Option<u32> {
        self.current_lap
    }

    pub fn lap_km(&self) -> f64 {
        self.lap_km
    }

    /// Applies the lap number and distance delta of one sample.
    ///
    /// The in-lap distance grows by `delta_km` only on `Started` and
    /// `Continued`.
    pub fn track(&mut self, lap_number: Option<u32>, delta_km: f64) -> LapTransition {
        let Some(lap) = lap_number else {
            return LapTransition::Untracked;
        };

        let transition = match self.current_lap {
            Some(current) if lap < current => {
                return LapTransition::Stale {
                    reported: lap,
                    current,
                };
            }
            Some(current) if lap == current => LapTransition::Continued,
            _ => {
                self.current_lap = Some(lap);
                self.lap_km = 0.0;
                LapTransition::Started(lap)
            }
        };

        self.lap_km = (self.lap_km + delta_km).min(f64::MAX);
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_lap_starts_tracking() {
        let mut tracker = LapTracker::default();
        assert_eq!(tracker.track(Some(1), 0.5), LapTransition::Started(1));
        assert_eq!(tracker.current_lap(), Some(1));
        assert_eq!(tracker.lap_km(), 0.5);
    }

    #[test]
    fn missing_lap_changes_nothing() {
        let mut tracker = LapTracker::default();
        tracker.track(Some(2), 1.0);
        assert_eq!(tracker.track(None, 3.0), LapTransition::Untracked);
        assert_eq!(tracker.current_lap(), Some(2));
        assert_eq!(tracker.lap_km(), 1.0);
    }

    #[test]
    fn new_lap_resets_in_lap_distance() {
        let mut tracker = LapTracker::default();
        tracker.track(Some(1), 2.0);
        tracker.track(Some(1), 1.25);
        assert_eq!(tracker.lap_km(), 3.25);

        // The delta of the sample that opens the lap counts towards the new lap.
        assert_eq!(tracker.track(Some(2), 0.0), LapTransition::Started(2));
        assert_eq!(tracker.lap_km(), 0.0);
        tracker.track(Some(2), 0.4);
        assert_eq!(tracker.lap_km(), 0.4);
    }

    #[test]
    fn lap_skip_is_a_start() {
        let mut tracker = LapTracker::default();
        tracker.track(Some(3), 1.0);
        assert_eq!(tracker.track(Some(7), 0.1), LapTransition::Started(7));
        assert_eq!(tracker.current_lap(), Some(7));
    }

    #[test]
    fn stale_lap_is_ignored() {
        let mut tracker = LapTracker::default();
        tracker.track(Some(4), 1.5);
        assert_eq!(
            tracker.track(Some(3), 9.0),
            LapTransition::Stale {
                reported: 3,
                current: 4
            }
        );
        assert_eq!(tracker.current_lap(), Some(4));
        assert_eq!(tracker.lap_km(), 1.5);
    }

    #[test]
    fn in_lap_distance_saturates() {
        let mut tracker = LapTracker::default();
        tracker.track(Some(1), f64::MAX);
        tracker.track(Some(1), f64::MAX);
        assert_eq!(tracker.lap_km(), f64::MAX);
    }
}
