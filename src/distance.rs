//! Pairwise Euclidean distances over a feature matrix.
//!
//! The distance matrix is the foundation for both retrieval accuracy scoring
//! and neighbor embedding. Distances are accumulated in f64 so that wide rows
//! (several thousand columns) do not lose precision in the running sum.

use crate::{ensure_finite, EvalError, Matrix, Result};

/// Computes the symmetric N x N matrix of Euclidean distances between rows.
///
/// The diagonal is zero. Fails with a shape error on an empty matrix and a
/// non-finite error if any value is NaN or infinite.
pub fn pairwise_distances(x: &Matrix) -> Result<Matrix> {
    if x.nrows() == 0 {
        return Err(EvalError::Shape(
            "feature matrix must have at least one row".to_string(),
        ));
    }
    ensure_finite(x)?;

    let n = x.nrows();
    let mut dist = Matrix::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let mut acc = 0.0_f64;
            for (a, b) in x.row(i).iter().zip(x.row(j).iter()) {
                let diff = f64::from(*a) - f64::from(*b);
                acc += diff * diff;
            }
            let d = acc.sqrt() as f32;
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }

    Ok(dist)
}

/// Overwrites the diagonal with `f32::MAX` so that nearest-neighbor scans
/// exclude self-distances.
///
/// Skipping this step makes every row trivially its own nearest neighbor and
/// silently reports perfect accuracy on any dataset.
pub fn mask_diagonal(dist: &mut Matrix) {
    let n = dist.nrows().min(dist.ncols());
    for i in 0..n {
        dist[[i, i]] = f32::MAX;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_known_distances() {
        let x = array![[0.0_f32, 0.0], [3.0, 4.0], [0.0, 4.0]];
        let dist = pairwise_distances(&x).unwrap();

        assert!((dist[[0, 1]] - 5.0).abs() < 1e-6);
        assert!((dist[[0, 2]] - 4.0).abs() < 1e-6);
        assert!((dist[[1, 2]] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetry_and_zero_diagonal() {
        let x = array![
            [1.0_f32, 2.0, 3.0],
            [4.0, 6.0, 8.0],
            [-1.0, 0.5, 2.5],
            [7.0, 7.0, 7.0]
        ];
        let dist = pairwise_distances(&x).unwrap();

        for i in 0..x.nrows() {
            assert_eq!(dist[[i, i]], 0.0);
            for j in 0..x.nrows() {
                assert_eq!(dist[[i, j]], dist[[j, i]]);
                assert!(dist[[i, j]] >= 0.0);
            }
        }
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let x = Matrix::zeros((0, 4));
        assert!(matches!(
            pairwise_distances(&x),
            Err(EvalError::Shape(_))
        ));
    }

    #[test]
    fn test_non_finite_rejected() {
        let x = array![[1.0_f32, 2.0], [f32::INFINITY, 0.0]];
        assert!(matches!(
            pairwise_distances(&x),
            Err(EvalError::NonFinite(_))
        ));
    }

    #[test]
    fn test_mask_diagonal() {
        let x = array![[0.0_f32, 0.0], [1.0, 1.0]];
        let mut dist = pairwise_distances(&x).unwrap();
        mask_diagonal(&mut dist);

        assert_eq!(dist[[0, 0]], f32::MAX);
        assert_eq!(dist[[1, 1]], f32::MAX);
        assert!(dist[[0, 1]] < f32::MAX);
    }
}
