//! Degree-2 polynomial expansion

use crate::error::{PricingError, Result};
use crate::features::ArrayTransform;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Original features followed by every product `x_i * x_j` with `i <= j`.
/// No bias column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    n_features_in: Option<usize>,
}

impl PolynomialFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_output_features(n_in: usize) -> usize {
        n_in + n_in * (n_in + 1) / 2
    }

    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        let mut names = input_names.to_vec();
        for i in 0..input_names.len() {
            for j in i..input_names.len() {
                if i == j {
                    names.push(format!("{}^2", input_names[i]));
                } else {
                    names.push(format!("{} {}", input_names[i], input_names[j]));
                }
            }
        }
        names
    }
}

impl ArrayTransform for PolynomialFeatures {
    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<f64>>) -> Result<&mut Self> {
        self.n_features_in = Some(x.ncols());
        Ok(self)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_in = self.n_features_in.ok_or(PricingError::ModelNotFitted)?;
        if x.ncols() != n_in {
            return Err(PricingError::ShapeError {
                expected: format!("{n_in} columns"),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), Self::n_output_features(n_in)));
        for (r, row) in x.rows().into_iter().enumerate() {
            let mut k = 0;
            for &v in row.iter() {
                out[[r, k]] = v;
                k += 1;
            }
            for i in 0..n_in {
                for j in i..n_in {
                    out[[r, k]] = row[i] * row[j];
                    k += 1;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_expansion_order() {
        let x = array![[2.0, 3.0]];
        let out = PolynomialFeatures::new().fit_transform(&x, None).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![2.0, 3.0, 4.0, 6.0, 9.0]);
    }

    #[test]
    fn test_output_width() {
        assert_eq!(PolynomialFeatures::n_output_features(6), 27);
        let names = PolynomialFeatures::new().feature_names(&["a".into(), "b".into()]);
        assert_eq!(names, vec!["a", "b", "a^2", "a b", "b^2"]);
    }
}
