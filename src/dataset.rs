use crate::{EvalError, Matrix, Result};
use std::collections::BTreeSet;

/// A feature matrix with its aligned integer class labels, one per row.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub features: Matrix,
    pub labels: Vec<i32>,
}

impl Dataset {
    pub fn new(features: Matrix, labels: Vec<i32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(EvalError::Shape(format!(
                "feature matrix has {} rows but {} labels were given",
                features.nrows(),
                labels.len()
            )));
        }

        Ok(Self { features, labels })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.labels.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Shapes a flat row-major value buffer into a matrix of the declared width.
///
/// Rejects element counts that do not divide evenly into rows, which catches
/// feature files read with the wrong width before any computation runs.
pub fn matrix_from_flat(values: Vec<f32>, n_features: usize) -> Result<Matrix> {
    if n_features == 0 {
        return Err(EvalError::Shape(
            "row width must be at least 1".to_string(),
        ));
    }
    if values.len() % n_features != 0 {
        return Err(EvalError::Shape(format!(
            "{} values do not divide evenly into rows of width {}",
            values.len(),
            n_features
        )));
    }

    let n_rows = values.len() / n_features;
    Matrix::from_shape_vec((n_rows, n_features), values)
        .map_err(|e| EvalError::Shape(e.to_string()))
}
