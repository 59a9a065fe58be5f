//! # Stream Interleaver
//!
//! Merges the per-driver sample streams of one session into a single emission
//! order and drives the distance integrator, lap tracker and ranking engine
//! once per emitted sample.
//!
//! ## Scheduling
//!
//! - **Round-robin** (default): each pass visits every driver that still has
//!   samples, in driver order, and emits one sample for each. Drivers with
//!   denser sampling simply keep going after the others run out. This is not
//!   a chronological merge; it keeps state bounded and the replay rate under
//!   the caller's control.
//! - **Chronological**: a min-heap keyed by each stream's elapsed time (the
//!   running sum of its `dt`) picks the sample that happened earliest. Equal
//!   times fall back to driver order.
//!
//! Both modes apply the same per-sample update and both end in
//! [`InterleaveState::Drained`] after exactly one record per sample.
//!
//! The interleaver is a plain [`Iterator`]; pacing, transport and cancellation
//! belong to the caller.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::replay::error::ReplayError;
use crate::replay::lap_tracker::LapTransition;
use crate::replay::ranking::RankingSnapshot;
use crate::replay::record::TelemetryRecord;
use crate::replay::sample::DriverStream;
use crate::replay::state::DriverRaceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterleaveMode {
    #[default]
    RoundRobin,
    Chronological,
}

impl FromStr for InterleaveMode {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round-robin" | "round_robin" | "roundrobin" => Ok(InterleaveMode::RoundRobin),
            "chronological" => Ok(InterleaveMode::Chronological),
            other => Err(ReplayError::UnknownInterleaveMode(other.to_string())),
        }
    }
}

impl fmt::Display for InterleaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterleaveMode::RoundRobin => f.write_str("round-robin"),
            InterleaveMode::Chronological => f.write_str("chronological"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterleaveState {
    /// At least one stream has unconsumed samples.
    Active,
    /// Terminal: every stream is exhausted.
    Drained,
}

/// Next sample of one driver in the chronological heap.
#[derive(Debug, Clone, Copy)]
struct Pending {
    at_seconds: f64,
    driver: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at_seconds
            .total_cmp(&other.at_seconds)
            .then_with(|| self.driver.cmp(&other.driver))
    }
}

#[derive(Debug)]
enum Schedule {
    RoundRobin { next: usize },
    Chronological { queue: BinaryHeap<Reverse<Pending>> },
}

/// One session's merge of all driver streams.
#[derive(Debug)]
pub struct Interleaver {
    streams: Vec<DriverStream>,
    cursors: Vec<usize>,
    states: Vec<DriverRaceState>,
    schedule: Schedule,
    phase: InterleaveState,
    emitted: usize,
}

impl Interleaver {
    /// Takes ownership of the streams. Empty streams are dropped here and
    /// never get a cursor, a race state or a ranking position.
    pub fn new(streams: Vec<DriverStream>, mode: InterleaveMode) -> Self {
        let streams: Vec<DriverStream> = streams
            .into_iter()
            .filter(|stream| {
                if stream.is_empty() {
                    tracing::debug!(driver = stream.driver(), "excluding driver without samples");
                }
                !stream.is_empty()
            })
            .collect();

        let schedule = match mode {
            InterleaveMode::RoundRobin => Schedule::RoundRobin { next: 0 },
            InterleaveMode::Chronological => Schedule::Chronological {
                queue: streams
                    .iter()
                    .enumerate()
                    .map(|(driver, stream)| {
                        Reverse(Pending {
                            at_seconds: dt_of(stream, 0),
                            driver,
                        })
                    })
                    .collect(),
            },
        };

        let count = streams.len();
        Self {
            cursors: vec![0; count],
            states: vec![DriverRaceState::default(); count],
            streams,
            schedule,
            phase: InterleaveState::Active,
            emitted: 0,
        }
    }

    pub fn state(&self) -> InterleaveState {
        self.phase
    }

    pub fn driver_count(&self) -> usize {
        self.streams.len()
    }

    pub fn total_samples(&self) -> usize {
        self.streams.iter().map(DriverStream::len).sum()
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn race_state(&self, driver: &str) -> Option<&DriverRaceState> {
        self.streams
            .iter()
            .position(|stream| stream.driver() == driver)
            .map(|index| &self.states[index])
    }

    /// Current live order, leader first.
    pub fn standings(&self) -> Vec<&str> {
        RankingSnapshot::compute(&self.states)
            .order()
            .iter()
            .map(|&index| self.streams[index].driver())
            .collect()
    }

    fn next_driver(&mut self) -> Option<usize> {
        match &mut self.schedule {
            Schedule::RoundRobin { next } => {
                let count = self.streams.len();
                for offset in 0..count {
                    let driver = (*next + offset) % count;
                    if self.cursors[driver] < self.streams[driver].len() {
                        *next = (driver + 1) % count;
                        return Some(driver);
                    }
                }
                None
            }
            Schedule::Chronological { queue } => {
                let Reverse(pending) = queue.pop()?;
                let driver = pending.driver;
                let following = self.cursors[driver] + 1;
                if following < self.streams[driver].len() {
                    queue.push(Reverse(Pending {
                        at_seconds: pending.at_seconds + dt_of(&self.streams[driver], following),
                        driver,
                    }));
                }
                Some(driver)
            }
        }
    }

    /// Consumes one sample of `driver`, updates its race state, re-ranks the
    /// field and packages the record.
    fn emit(&mut self, driver: usize) -> TelemetryRecord {
        let sample = self.streams[driver].samples()[self.cursors[driver]];
        self.cursors[driver] += 1;
        self.emitted += 1;

        let update = self.states[driver].apply(&sample);
        if let LapTransition::Stale { reported, current } = update.transition {
            tracing::debug!(
                driver = self.streams[driver].driver(),
                reported,
                current,
                "ignoring stale lap number"
            );
        }

        let ranking = RankingSnapshot::compute(&self.states);

        TelemetryRecord {
            driver: self.streams[driver].driver().to_string(),
            lap_number: sample.lap_number(),
            position: ranking.position(driver),
            cumulative_distance_km: self.states[driver].cumulative_km(),
            speed_kmh: sample.speed_kmh().unwrap_or(0.0),
        }
    }
}

impl Iterator for Interleaver {
    type Item = TelemetryRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase == InterleaveState::Drained {
            return None;
        }
        match self.next_driver() {
            Some(driver) => Some(self.emit(driver)),
            None => {
                self.phase = InterleaveState::Drained;
                tracing::debug!(records = self.emitted, "all driver streams drained");
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples() - self.emitted;
        (remaining, Some(remaining))
    }
}

fn dt_of(stream: &DriverStream, index: usize) -> f64 {
    stream.samples()[index].dt_seconds().unwrap_or(0.0)
}
