pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod dataset;
pub mod decomposition;
pub mod distance;
pub mod embedding;
pub mod error;
pub mod io;
pub mod metrics;

pub use dataset::Dataset;
pub use decomposition::PCA;
pub use embedding::TSNE;
pub use error::{EvalError, Result};

pub type Vector = Array1<f32>;
pub type Matrix = Array2<f32>;

/// Rejects matrices containing NaN or infinity before any computation runs on them.
pub(crate) fn ensure_finite(x: &Matrix) -> Result<()> {
    for ((i, j), v) in x.indexed_iter() {
        if !v.is_finite() {
            return Err(EvalError::NonFinite(format!(
                "value {} at row {}, column {}",
                v, i, j
            )));
        }
    }
    Ok(())
}
