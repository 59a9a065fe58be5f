//! Ordinary least-squares fit of race lap time against qualifying time, with
//! a seeded train/test split for the error estimate.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Fraction of rows held out for the error estimate.
pub const TEST_FRACTION: f64 = 0.2;
/// Seed of the split shuffle, so every session reports the same error.
pub const SPLIT_SEED: u64 = 39;

/// `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearModel {
    /// Least-squares fit. `None` for no rows; a constant line at the mean
    /// when every `x` is the same.
    pub fn fit(rows: &[(f64, f64)]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let mean_x = rows.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = rows.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in rows {
            sxy += (x - mean_x) * (y - mean_y);
            sxx += (x - mean_x) * (x - mean_x);
        }

        let slope = if sxx > f64::EPSILON { sxy / sxx } else { 0.0 };
        Some(Self {
            intercept: mean_y - slope * mean_x,
            slope,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    pub fn mean_absolute_error(&self, rows: &[(f64, f64)]) -> Option<f64> {
        if rows.is_empty() {
            return None;
        }
        let total: f64 = rows.iter().map(|(x, y)| (self.predict(*x) - y).abs()).sum();
        Some(total / rows.len() as f64)
    }
}

/// Shuffles with [`SPLIT_SEED`] and holds out `ceil(TEST_FRACTION * n)` rows.
/// With fewer than two rows everything is training data.
pub fn train_test_split(rows: &[(f64, f64)]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    if rows.len() < 2 {
        return (rows.to_vec(), Vec::new());
    }

    let mut shuffled = rows.to_vec();
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    shuffled.shuffle(&mut rng);

    let test_len = ((rows.len() as f64) * TEST_FRACTION).ceil() as usize;
    let test = shuffled.split_off(rows.len() - test_len);
    (shuffled, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_an_exact_line() {
        let rows: Vec<_> = (0..10).map(|i| (i as f64, 2.0 + 0.5 * i as f64)).collect();
        let model = LinearModel::fit(&rows).unwrap();
        assert!((model.slope - 0.5).abs() < 1e-12);
        assert!((model.intercept - 2.0).abs() < 1e-12);
        assert!(model.mean_absolute_error(&rows).unwrap() < 1e-12);
    }

    #[test]
    fn constant_x_predicts_the_mean() {
        let model = LinearModel::fit(&[(75.0, 80.0), (75.0, 82.0)]).unwrap();
        assert_eq!(model.slope, 0.0);
        assert_eq!(model.predict(70.0), 81.0);
    }

    #[test]
    fn no_rows_no_model() {
        assert_eq!(LinearModel::fit(&[]), None);
        let model = LinearModel { intercept: 1.0, slope: 1.0 };
        assert_eq!(model.mean_absolute_error(&[]), None);
    }

    #[test]
    fn split_sizes() {
        let rows: Vec<_> = (0..11).map(|i| (i as f64, i as f64)).collect();
        let (train, test) = train_test_split(&rows);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);

        let (train, test) = train_test_split(&rows[..1]);
        assert_eq!((train.len(), test.len()), (1, 0));

        let (train, test) = train_test_split(&rows[..2]);
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    #[test]
    fn split_is_reproducible() {
        let rows: Vec<_> = (0..20).map(|i| (i as f64, (i * 3) as f64)).collect();
        assert_eq!(train_test_split(&rows), train_test_split(&rows));
    }
}
