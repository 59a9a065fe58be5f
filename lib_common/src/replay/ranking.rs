//! # Ranking Engine
//!
//! Live race order from lap number and in-lap distance. A driver on a higher
//! lap is ahead; on the same lap, the one further into the lap is ahead.
//! Finish times play no role.
//!
//! Ties (same lap, same in-lap distance) keep the enumeration order of the
//! input slice, which is the order drivers first appeared in the source data.
//! `sort_by` is stable, so identical inputs always produce identical
//! positions.

use std::cmp::Ordering;

use crate::replay::state::DriverRaceState;

/// Positions for one instant, indexed like the input states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankingSnapshot {
    positions: Vec<Option<u32>>,
    order: Vec<usize>,
}

impl RankingSnapshot {
    /// Ranks every driver that has started a lap. Drivers without a lap get
    /// no position.
    pub fn compute(states: &[DriverRaceState]) -> Self {
        let mut order: Vec<usize> = states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.current_lap().is_some())
            .map(|(index, _)| index)
            .collect();

        order.sort_by(|&a, &b| race_order(&states[a], &states[b]));

        let mut positions = vec![None; states.len()];
        for (rank, &index) in order.iter().enumerate() {
            positions[index] = Some(rank as u32 + 1);
        }

        Self { positions, order }
    }

    /// 1-based position of the driver at `index`, if ranked.
    pub fn position(&self, index: usize) -> Option<u32> {
        self.positions.get(index).copied().flatten()
    }

    /// Driver indices from leader to last ranked driver.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn ranked_count(&self) -> usize {
        self.order.len()
    }
}

/// Leader first: lap descending, then in-lap distance descending.
fn race_order(a: &DriverRaceState, b: &DriverRaceState) -> Ordering {
    b.current_lap()
        .cmp(&a.current_lap())
        .then_with(|| b.lap_km().total_cmp(&a.lap_km()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::sample::Sample;
    use proptest::prelude::*;

    fn state_at(samples: &[(f64, f64, Option<u32>)]) -> DriverRaceState {
        let mut state = DriverRaceState::default();
        for &(speed, dt, lap) in samples {
            state.apply(&Sample::new(Some(speed), Some(dt), lap).unwrap());
        }
        state
    }

    #[test]
    fn higher_lap_leads() {
        let states = [
            state_at(&[(300.0, 10.0, Some(1))]),
            state_at(&[(100.0, 1.0, Some(2))]),
        ];
        let snapshot = RankingSnapshot::compute(&states);
        assert_eq!(snapshot.position(1), Some(1));
        assert_eq!(snapshot.position(0), Some(2));
    }

    #[test]
    fn same_lap_orders_by_in_lap_distance() {
        let states = [
            state_at(&[(100.0, 1.0, Some(3))]),
            state_at(&[(200.0, 1.0, Some(3))]),
            state_at(&[(150.0, 1.0, Some(3))]),
        ];
        let snapshot = RankingSnapshot::compute(&states);
        assert_eq!(snapshot.order(), &[1, 2, 0]);
    }

    #[test]
    fn drivers_without_a_lap_are_unranked() {
        let states = [
            state_at(&[(250.0, 1.0, None)]),
            state_at(&[(100.0, 1.0, Some(1))]),
            DriverRaceState::default(),
        ];
        let snapshot = RankingSnapshot::compute(&states);
        assert_eq!(snapshot.position(0), None);
        assert_eq!(snapshot.position(1), Some(1));
        assert_eq!(snapshot.position(2), None);
        assert_eq!(snapshot.ranked_count(), 1);
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let states = [
            state_at(&[(120.0, 1.0, Some(5))]),
            state_at(&[(120.0, 1.0, Some(5))]),
            state_at(&[(120.0, 1.0, Some(5))]),
        ];
        let first = RankingSnapshot::compute(&states);
        assert_eq!(first.order(), &[0, 1, 2]);
        assert_eq!(first, RankingSnapshot::compute(&states));
    }

    #[test]
    fn out_of_range_index_has_no_position() {
        let snapshot = RankingSnapshot::compute(&[]);
        assert_eq!(snapshot.position(4), None);
    }

    proptest! {
        #[test]
        fn positions_form_a_permutation(
            drivers in proptest::collection::vec(
                (proptest::option::of(1u32..4), 0.0f64..300.0, 0.0f64..2.0),
                0..12,
            )
        ) {
            let states: Vec<_> = drivers
                .iter()
                .map(|&(lap, speed, dt)| state_at(&[(speed, dt, lap)]))
                .collect();
            let snapshot = RankingSnapshot::compute(&states);

            let mut seen: Vec<u32> = (0..states.len()).filter_map(|i| snapshot.position(i)).collect();
            seen.sort_unstable();
            let expected: Vec<u32> = (1..=snapshot.ranked_count() as u32).collect();
            prop_assert_eq!(seen, expected);

            for (index, (lap, _, _)) in drivers.iter().enumerate() {
                prop_assert_eq!(lap.is_some(), snapshot.position(index).is_some());
            }
        }
    }
}
