//! # Lap-Time Prediction
//!
//! Produces the one-shot forecast a session sends before its telemetry. The
//! model learns how qualifying pace translated into race lap times in a
//! reference session, then applies it to a new qualifying table.
//!
//! Training rows are the qualifying entries joined, by driver code, with every
//! lap time that driver recorded in the reference session. Drivers missing
//! from the reference session still receive a prediction.

use std::sync::Arc;

use thiserror::Error;

use crate::feeds::{FeedError, RaceDataSource, SessionKey};
use crate::replay::{PredictedLap, PredictionSet};

/// Least-squares model and train/test split.
pub mod model;
/// Qualifying table and the built-in grid.
pub mod qualifying;

pub use model::LinearModel;
pub use qualifying::{default_grid, QualifyingEntry};

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("reference session unavailable: {0}")]
    ReferenceSession(#[from] FeedError),

    #[error("qualifying table is empty")]
    EmptyGrid,
}

/// Anything that can produce the forecast.
pub trait LapTimePredictor: Send + Sync {
    fn predict(&self) -> Result<PredictionSet, PredictionError>;
}

/// Fits [`LinearModel`] on a reference session read from a data source.
pub struct HistoricalLapModel {
    source: Arc<dyn RaceDataSource>,
    reference: SessionKey,
    grid: Vec<QualifyingEntry>,
}

impl HistoricalLapModel {
    pub fn new(source: Arc<dyn RaceDataSource>, reference: SessionKey, grid: Vec<QualifyingEntry>) -> Self {
        Self {
            source,
            reference,
            grid,
        }
    }

    /// `(qualifying seconds, lap seconds)` pairs.
    fn training_rows(&self, lap_times: &[(&str, f64)]) -> Vec<(f64, f64)> {
        self.grid
            .iter()
            .flat_map(|entry| {
                lap_times
                    .iter()
                    .filter(move |(code, _)| *code == entry.driver_code)
                    .map(move |(_, secs)| (entry.qualifying_seconds, *secs))
            })
            .collect()
    }
}

impl LapTimePredictor for HistoricalLapModel {
    fn predict(&self) -> Result<PredictionSet, PredictionError> {
        if self.grid.is_empty() {
            return Err(PredictionError::EmptyGrid);
        }

        let archive = self.source.load_session(&self.reference)?;
        let rows = self.training_rows(&archive.lap_times());
        if rows.is_empty() {
            tracing::warn!(reference = %self.reference, "no lap times match the qualifying grid");
            return Ok(PredictionSet::default());
        }

        let (train, test) = model::train_test_split(&rows);
        let Some(fitted) = LinearModel::fit(&train) else {
            return Ok(PredictionSet::default());
        };

        let mut predictions: Vec<PredictedLap> = self
            .grid
            .iter()
            .map(|entry| PredictedLap {
                driver_name: entry.driver_name.clone(),
                predicted_seconds: fitted.predict(entry.qualifying_seconds),
            })
            .collect();
        predictions.sort_by(|a, b| a.predicted_seconds.total_cmp(&b.predicted_seconds));

        let mae = fitted.mean_absolute_error(&test);
        tracing::info!(
            rows = rows.len(),
            train = train.len(),
            test = test.len(),
            slope = fitted.slope,
            intercept = fitted.intercept,
            mae = ?mae,
            "lap-time model fitted"
        );

        Ok(PredictionSet {
            predictions,
            mean_absolute_error_seconds: mae,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{ArchivedLap, SessionArchive};

    struct FixedSource(Option<SessionArchive>);

    impl RaceDataSource for FixedSource {
        fn load_session(&self, key: &SessionKey) -> Result<SessionArchive, FeedError> {
            self.0.clone().ok_or_else(|| FeedError::NotFound {
                path: key.file_name().into(),
            })
        }
    }

    fn reference(laps: &[(&str, f64)]) -> SessionArchive {
        SessionArchive {
            key: SessionKey::new(2024, "Monaco", "R"),
            laps: laps
                .iter()
                .enumerate()
                .map(|(i, (driver, secs))| ArchivedLap {
                    driver: driver.to_string(),
                    lap_number: Some(i as u32 + 1),
                    lap_time_s: Some(*secs),
                    car_data: Vec::new(),
                })
                .collect(),
        }
    }

    fn model(source: FixedSource, grid: Vec<QualifyingEntry>) -> HistoricalLapModel {
        HistoricalLapModel::new(Arc::new(source), SessionKey::new(2024, "Monaco", "R"), grid)
    }

    #[test]
    fn predictions_are_sorted_fastest_first() {
        let grid = vec![
            QualifyingEntry::new("Slow Driver", "SLO", 77.0),
            QualifyingEntry::new("Fast Driver", "FST", 75.0),
            QualifyingEntry::new("Mid Driver", "MID", 76.0),
        ];
        // Lap time = qualifying + 3 s, exactly.
        let laps = [
            ("SLO", 80.0),
            ("SLO", 80.0),
            ("FST", 78.0),
            ("FST", 78.0),
            ("MID", 79.0),
            ("MID", 79.0),
        ];
        let set = model(FixedSource(Some(reference(&laps))), grid).predict().unwrap();

        let names: Vec<_> = set.predictions.iter().map(|p| p.driver_name.as_str()).collect();
        assert_eq!(names, vec!["Fast Driver", "Mid Driver", "Slow Driver"]);
        assert!((set.predictions[0].predicted_seconds - 78.0).abs() < 1e-9);
        assert!(set.mean_absolute_error_seconds.unwrap() < 1e-9);
    }

    #[test]
    fn unmatched_grid_yields_empty_prediction() {
        let grid = vec![QualifyingEntry::new("Lando Norris", "NOR", 75.096)];
        let set = model(FixedSource(Some(reference(&[("XXX", 80.0)]))), grid)
            .predict()
            .unwrap();
        assert!(set.predictions.is_empty());
        assert_eq!(set.mean_absolute_error_seconds, None);
    }

    #[test]
    fn single_row_trains_without_error_estimate() {
        let grid = vec![
            QualifyingEntry::new("Lando Norris", "NOR", 75.096),
            QualifyingEntry::new("Oscar Piastri", "PIA", 75.180),
        ];
        let set = model(FixedSource(Some(reference(&[("NOR", 79.5)]))), grid)
            .predict()
            .unwrap();
        assert_eq!(set.predictions.len(), 2);
        assert!(set.predictions.iter().all(|p| p.predicted_seconds == 79.5));
        assert_eq!(set.mean_absolute_error_seconds, None);
    }

    #[test]
    fn missing_reference_session_is_an_error() {
        let err = model(FixedSource(None), default_grid()).predict().unwrap_err();
        assert!(matches!(err, PredictionError::ReferenceSession(FeedError::NotFound { .. })));
    }

    #[test]
    fn empty_grid_is_an_error() {
        let err = model(FixedSource(Some(reference(&[]))), Vec::new())
            .predict()
            .unwrap_err();
        assert!(matches!(err, PredictionError::EmptyGrid));
    }

    #[test]
    fn default_grid_has_twelve_distinct_codes() {
        let grid = default_grid();
        assert_eq!(grid.len(), 12);
        let mut codes: Vec<_> = grid.iter().map(|e| e.driver_code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 12);
    }
}
