//! Seeded train/test partitioning

use super::target_values;
use crate::error::{PricingError, Result};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Features and targets for both sides of a hold-out split
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub x_train: DataFrame,
    pub y_train: Array1<f64>,
    pub x_test: DataFrame,
    pub y_test: Array1<f64>,
}

/// Shuffle rows with a seeded RNG and hold out `ceil(n * test_size)` of them.
pub fn train_test_split(
    df: &DataFrame,
    target: &str,
    test_size: f64,
    seed: u64,
) -> Result<DatasetSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PricingError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n = df.height();
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PricingError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: format!("leaves an empty side with {n} rows"),
        });
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = take_rows(df, train_idx)?;
    let test = take_rows(df, test_idx)?;

    Ok(DatasetSplit {
        y_train: target_values(&train, target)?,
        x_train: train.drop(target)?,
        y_test: target_values(&test, target)?,
        x_test: test.drop(target)?,
    })
}

/// Subset rows by position, preserving the given order.
pub fn take_rows(df: &DataFrame, rows: &[IdxSize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx".into(), rows.to_vec());
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> DataFrame {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| 10.0 * i as f64).collect();
        df!("x" => x, "price" => y).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(&frame(10), "price", 0.2, 42).unwrap();
        assert_eq!(split.x_train.height(), 8);
        assert_eq!(split.x_test.height(), 2);
        assert_eq!(split.y_train.len(), 8);
        assert!(split.x_train.column("price").is_err());
    }

    #[test]
    fn test_split_keeps_rows_aligned() {
        let split = train_test_split(&frame(25), "price", 0.2, 7).unwrap();
        let x = split.x_train.column("x").unwrap().f64().unwrap();
        for (xi, yi) in x.into_iter().zip(split.y_train.iter()) {
            assert_eq!(xi.unwrap() * 10.0, *yi);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = train_test_split(&frame(30), "price", 0.2, 42).unwrap();
        let b = train_test_split(&frame(30), "price", 0.2, 42).unwrap();
        assert_eq!(a.y_test, b.y_test);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(train_test_split(&frame(10), "price", 0.0, 42).is_err());
        assert!(train_test_split(&frame(1), "price", 0.5, 42).is_err());
    }
}
