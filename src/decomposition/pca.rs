use crate::io::{f32s_from_bytes, write_f32s};
use crate::{ensure_finite, EvalError, Matrix, Result, Vector};
use ndarray::{Array1, Array2, Axis};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const POWER_MAX_ITER: usize = 500;
const POWER_TOL: f64 = 1e-11;
const OPERATOR_EPS: f64 = 1e-12;

/// Principal component analysis fitted by explicit power iteration with
/// deflation.
///
/// Components are ordered by descending explained variance; equal variances
/// keep the order they were extracted in, which is deterministic for a given
/// input. Each component direction is only defined up to a global sign flip:
/// two fits of the same data always agree, but consumers comparing against
/// externally computed components must compare up to sign.
#[derive(Clone, Debug)]
pub struct PCA {
    pub components: Option<Matrix>,
    pub explained_variance: Option<Vector>,
    pub explained_variance_ratio: Option<Vector>,
    pub mean: Option<Vector>,
    n_components: Option<usize>,
}

impl PCA {
    pub fn new() -> Self {
        Self {
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
            mean: None,
            n_components: None,
        }
    }

    /// Number of directions to keep. Must satisfy
    /// `1 <= n_components <= min(n_samples - 1, n_features)` at fit time;
    /// defaults to the upper bound when unset.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples < 2 {
            return Err(EvalError::DegenerateInput(format!(
                "PCA needs at least 2 samples, got {}",
                n_samples
            )));
        }
        if n_features == 0 {
            return Err(EvalError::Shape(
                "input matrix must have at least one feature column".to_string(),
            ));
        }
        ensure_finite(x)?;

        let max_components = n_features.min(n_samples - 1);
        let n_components = self.n_components.unwrap_or(max_components);
        if n_components == 0 || n_components > max_components {
            return Err(EvalError::InvalidConfig(format!(
                "n_components={} must be between 1 and min(n_samples - 1, n_features)={}",
                n_components, max_components
            )));
        }

        // Centering and all eigen work run in f64; the fitted model is stored
        // back in f32 to match the on-disk data model.
        let x64 = x.mapv(f64::from);
        let mean = x64.mean_axis(Axis(0)).unwrap();
        let centered = &x64 - &mean.view().insert_axis(Axis(0));

        let denom = (n_samples - 1) as f64;
        let total_variance = centered.mapv(|v| v * v).sum() / denom;
        if total_variance <= OPERATOR_EPS {
            return Err(EvalError::DegenerateInput(
                "all rows are identical, variance is zero".to_string(),
            ));
        }

        // Eigen-decompose whichever scatter matrix is smaller: the D x D
        // covariance when samples outnumber features, otherwise the N x N
        // Gram matrix whose eigenvectors map back through the centered data.
        let mut pairs: Vec<(f64, Array1<f64>)> = if n_samples > n_features {
            let cov = centered.t().dot(&centered) / denom;
            leading_eigenpairs(&cov, n_components)
        } else {
            let gram = centered.dot(&centered.t()) / denom;
            leading_eigenpairs(&gram, n_components)
                .into_iter()
                .map(|(value, u)| (value, centered.t().dot(&u)))
                .collect()
        };

        // Stable descending sort: equal variances keep extraction order.
        pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let mut directions: Vec<Array1<f64>> = Vec::with_capacity(n_components);
        let mut variances: Vec<f64> = Vec::with_capacity(n_components);
        for (value, vector) in pairs {
            let norm = vector.dot(&vector).sqrt();
            let direction = if norm > 1e-9 {
                vector / norm
            } else {
                // Rank exhausted: deterministically complete the basis so the
                // component count stays as requested.
                orthonormal_fallback(&directions, n_features)
            };
            variances.push(value.max(0.0));
            directions.push(direction);
        }

        let mut components = Matrix::zeros((n_components, n_features));
        for (i, direction) in directions.iter().enumerate() {
            components.row_mut(i).assign(&direction.mapv(|v| v as f32));
        }
        let explained_variance: Vector =
            variances.iter().map(|&v| v as f32).collect::<Vec<f32>>().into();
        let explained_variance_ratio: Vector = variances
            .iter()
            .map(|&v| (v / total_variance) as f32)
            .collect::<Vec<f32>>()
            .into();

        debug!(
            n_samples,
            n_features,
            n_components,
            explained = f64::from(explained_variance_ratio.sum()),
            "fitted PCA"
        );

        self.components = Some(components);
        self.explained_variance = Some(explained_variance);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        self.mean = Some(mean.mapv(|v| v as f32));

        Ok(())
    }

    /// Projects each row through `(row - mean) . components^T`, yielding an
    /// N x k matrix. Pure with respect to the model.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let components = self.components.as_ref().ok_or(EvalError::NotFitted)?;
        let mean = self.mean.as_ref().ok_or(EvalError::NotFitted)?;

        if x.ncols() != mean.len() {
            return Err(EvalError::Shape(format!(
                "input has {} features but the model was fit on {}",
                x.ncols(),
                mean.len()
            )));
        }
        ensure_finite(x)?;

        let centered = x - &mean.view().insert_axis(Axis(0));
        Ok(centered.dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Maps projected rows back to the original space via
    /// `projected . components + mean`.
    pub fn inverse_transform(&self, x: &Matrix) -> Result<Matrix> {
        let components = self.components.as_ref().ok_or(EvalError::NotFitted)?;
        let mean = self.mean.as_ref().ok_or(EvalError::NotFitted)?;

        if x.ncols() != components.nrows() {
            return Err(EvalError::Shape(format!(
                "input has {} columns but the model keeps {} components",
                x.ncols(),
                components.nrows()
            )));
        }

        Ok(x.dot(components) + &mean.view().insert_axis(Axis(0)))
    }

    /// Writes the fitted model as D little-endian f32 values of the negated
    /// mean followed by the k x D component matrix, row-major.
    ///
    /// The format carries exactly what a consumer needs to apply `transform`
    /// as `(row + neg_mean) . components^T`; explained variances are not
    /// stored.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let components = self.components.as_ref().ok_or(EvalError::NotFitted)?;
        let mean = self.mean.as_ref().ok_or(EvalError::NotFitted)?;

        write_f32s(writer, mean.iter().map(|v| -v))?;
        write_f32s(writer, components.iter().copied())?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Reconstructs a model from the binary layout produced by [`write_to`]:
    /// D floats of negated mean, then k rows of D component floats. The
    /// component count is inferred from the payload length.
    ///
    /// [`write_to`]: PCA::write_to
    pub fn read_from<R: Read>(reader: &mut R, n_features: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, n_features)
    }

    pub fn load<P: AsRef<Path>>(path: P, n_features: usize) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, n_features)
    }

    fn from_bytes(bytes: &[u8], n_features: usize) -> Result<Self> {
        if n_features == 0 {
            return Err(EvalError::InvalidConfig(
                "n_features must be positive".to_string(),
            ));
        }

        let values = f32s_from_bytes(bytes)?;
        if values.len() < 2 * n_features {
            return Err(EvalError::MalformedFile(format!(
                "model file holds {} values, need at least {} for a mean and one component",
                values.len(),
                2 * n_features
            )));
        }
        if values.len() % n_features != 0 {
            return Err(EvalError::MalformedFile(format!(
                "{} values do not divide into rows of width {}",
                values.len(),
                n_features
            )));
        }

        let mean: Vector = values[..n_features].iter().map(|v| -v).collect::<Vec<f32>>().into();
        let k = values.len() / n_features - 1;
        let components = Matrix::from_shape_vec((k, n_features), values[n_features..].to_vec())
            .map_err(|e| EvalError::MalformedFile(e.to_string()))?;

        Ok(Self {
            components: Some(components),
            explained_variance: None,
            explained_variance_ratio: None,
            mean: Some(mean),
            n_components: Some(k),
        })
    }
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the `k` leading eigenpairs of a symmetric positive semi-definite
/// matrix by power iteration with deflation.
///
/// When the operator runs out of rank before `k` pairs are found, the
/// remaining slots are filled with zero pairs for the caller to substitute.
fn leading_eigenpairs(a: &Array2<f64>, k: usize) -> Vec<(f64, Array1<f64>)> {
    let m = a.nrows();
    let mut deflated = a.clone();
    let mut pairs = Vec::with_capacity(k);

    for _ in 0..k {
        match dominant_eigenpair(&deflated) {
            Some((value, vector)) => {
                let outer = vector
                    .view()
                    .insert_axis(Axis(1))
                    .dot(&vector.view().insert_axis(Axis(0)));
                deflated = &deflated - &(outer * value);
                pairs.push((value, vector));
            }
            None => pairs.push((0.0, Array1::zeros(m))),
        }
    }

    pairs
}

/// Power iteration with a Rayleigh-quotient convergence check. Returns `None`
/// when the operator is numerically zero.
fn dominant_eigenpair(a: &Array2<f64>) -> Option<(f64, Array1<f64>)> {
    let mut v = starting_vector(a)?;
    let mut value = v.dot(&a.dot(&v));

    for _ in 0..POWER_MAX_ITER {
        let av = a.dot(&v);
        let norm = av.dot(&av).sqrt();
        if norm < OPERATOR_EPS {
            break;
        }
        v = av / norm;
        let next = v.dot(&a.dot(&v));
        let converged = (next - value).abs() <= POWER_TOL * next.abs().max(1.0);
        value = next;
        if converged {
            break;
        }
    }

    Some((value, v))
}

/// Picks a deterministic unit start vector that the operator does not
/// annihilate: the uniform vector first, then standard basis vectors by
/// ascending index.
fn starting_vector(a: &Array2<f64>) -> Option<Array1<f64>> {
    let m = a.nrows();

    let uniform = Array1::from_elem(m, (m as f64).sqrt().recip());
    let image = a.dot(&uniform);
    if image.dot(&image).sqrt() > OPERATOR_EPS {
        return Some(uniform);
    }

    for j in 0..m {
        let mut basis = Array1::zeros(m);
        basis[j] = 1.0;
        let image = a.dot(&basis);
        if image.dot(&image).sqrt() > OPERATOR_EPS {
            return Some(basis);
        }
    }

    None
}

/// Deterministically completes an orthonormal set: the first standard basis
/// vector with a usable residual after Gram-Schmidt against `existing`,
/// normalized. Lowest index wins.
fn orthonormal_fallback(existing: &[Array1<f64>], dim: usize) -> Array1<f64> {
    for m in 0..dim {
        let mut candidate = Array1::<f64>::zeros(dim);
        candidate[m] = 1.0;
        for prev in existing {
            let proj = candidate.dot(prev);
            candidate = candidate - prev * proj;
        }
        let norm = candidate.dot(&candidate).sqrt();
        if norm > 1e-6 {
            return candidate / norm;
        }
    }
    // Unreachable for existing.len() < dim; keeps the function total.
    Array1::zeros(dim)
}
