//! Retrieval quality metrics over a precomputed distance matrix.

use crate::{distance, EvalError, Matrix, Result};

/// Finds each row's nearest other row by scanning a diagonal-masked copy of
/// the distance matrix.
///
/// Ties resolve to the lowest column index: the scan uses a strict `<` so the
/// first occurrence of the minimum wins. This is deterministic across runs on
/// identical input.
pub fn nearest_neighbors(distances: &Matrix) -> Result<Vec<usize>> {
    let n = distances.nrows();
    if distances.ncols() != n {
        return Err(EvalError::Shape(format!(
            "distance matrix must be square, got {}x{}",
            n,
            distances.ncols()
        )));
    }
    if n < 2 {
        return Err(EvalError::Shape(format!(
            "need at least 2 rows to find a nearest other row, got {}",
            n
        )));
    }

    // Self-distances are zero, so the diagonal must be masked before the scan
    // or every row would trivially pick itself.
    let mut masked = distances.clone();
    distance::mask_diagonal(&mut masked);

    let mut closest = Vec::with_capacity(n);
    for i in 0..n {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (j, &d) in masked.row(i).iter().enumerate() {
            if d < best_dist {
                best_dist = d;
                best = j;
            }
        }
        closest.push(best);
    }

    Ok(closest)
}

/// Leave-one-out nearest-neighbor accuracy: the fraction of rows whose
/// nearest other row carries the same label.
///
/// `labels` must align 1:1 with the distance matrix rows. Returns a value in
/// [0, 1].
pub fn nearest_neighbor_accuracy(distances: &Matrix, labels: &[i32]) -> Result<f64> {
    let n = distances.nrows();
    if labels.len() != n {
        return Err(EvalError::Shape(format!(
            "distance matrix has {} rows but {} labels were given",
            n,
            labels.len()
        )));
    }

    let closest = nearest_neighbors(distances)?;

    let mut matches = 0;
    for (i, &j) in closest.iter().enumerate() {
        if labels[i] == labels[j] {
            matches += 1;
        }
    }

    Ok(matches as f64 / n as f64)
}
