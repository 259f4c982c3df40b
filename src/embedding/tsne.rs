use crate::{distance, ensure_finite, EvalError, Matrix, Result};
use ndarray::{Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

const MIN_PROB: f64 = 1e-12;
const MIN_GAIN: f64 = 0.01;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MOMENTUM_SWITCH_ITER: usize = 250;
const PERPLEXITY_SEARCH_STEPS: usize = 50;
const ENTROPY_TOL: f64 = 1e-5;
const INIT_SPREAD: f64 = 1e-4;

/// t-distributed stochastic neighbor embedding into two dimensions.
///
/// Per-point Gaussian affinities are calibrated by binary search to a target
/// perplexity, then a fixed budget of gradient-descent iterations matches the
/// heavy-tailed embedding-space distribution to them. The optimizer uses the
/// classic momentum schedule (0.5 before iteration 250, 0.8 after) with
/// per-coordinate adaptive gains, and recenters the embedding every
/// iteration.
///
/// Defaults: `perplexity` 30, `learning_rate` 200, `n_iter` 1000,
/// `early_exaggeration` 12 applied for the first 250 iterations. Runs are
/// stochastic unless a seed is pinned with `random_state`; different seeds
/// give different but qualitatively similar layouts.
#[derive(Clone, Debug)]
pub struct TSNE {
    pub embedding: Option<Matrix>,
    pub kl_divergence: Option<f64>,
    perplexity: f64,
    learning_rate: f64,
    n_iter: usize,
    early_exaggeration: f64,
    exaggeration_iter: usize,
    random_state: Option<u64>,
}

impl TSNE {
    pub fn new() -> Self {
        Self {
            embedding: None,
            kl_divergence: None,
            perplexity: 30.0,
            learning_rate: 200.0,
            n_iter: 1000,
            early_exaggeration: 12.0,
            exaggeration_iter: 250,
            random_state: None,
        }
    }

    /// Locality parameter: the effective number of neighbors each point
    /// considers. Must be at least 1 and smaller than the sample count.
    pub fn perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Fixed iteration budget. Termination is guaranteed by the budget, not
    /// by a convergence threshold.
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Factor applied to the input affinities for the first 250 iterations so
    /// clusters form before fine structure settles.
    pub fn early_exaggeration(mut self, early_exaggeration: f64) -> Self {
        self.early_exaggeration = early_exaggeration;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Maps N rows of D features to N 2-D points preserving local neighbor
    /// structure.
    ///
    /// One-dimensional input is duplicated into both output columns and
    /// two-dimensional input is returned unchanged; neither runs the
    /// optimizer. Anything wider goes through the full affinity-matching
    /// descent.
    pub fn fit_transform(&mut self, x: &Matrix) -> Result<Matrix> {
        let n = x.nrows();
        if n < 2 {
            return Err(EvalError::Shape(format!(
                "t-SNE needs at least 2 samples, got {}",
                n
            )));
        }
        ensure_finite(x)?;

        let embedding = match x.ncols() {
            0 => {
                return Err(EvalError::Shape(
                    "input matrix must have at least one feature column".to_string(),
                ));
            }
            1 => {
                // Degenerate passthrough: duplicate the single coordinate.
                let mut out = Matrix::zeros((n, 2));
                out.column_mut(0).assign(&x.column(0));
                out.column_mut(1).assign(&x.column(0));
                self.kl_divergence = None;
                out
            }
            2 => {
                // Already a planar layout.
                self.kl_divergence = None;
                x.clone()
            }
            _ => {
                if self.perplexity < 1.0 || self.perplexity >= n as f64 {
                    return Err(EvalError::InvalidConfig(format!(
                        "perplexity {} must be at least 1 and smaller than the sample count {}",
                        self.perplexity, n
                    )));
                }
                let p = self.joint_affinities(x)?;
                let (y, kl) = self.optimize(&p, n);
                self.kl_divergence = Some(kl);
                y.mapv(|v| v as f32)
            }
        };

        self.embedding = Some(embedding.clone());
        Ok(embedding)
    }

    /// Symmetrized joint neighbor distribution over the input rows, with each
    /// row's Gaussian precision calibrated to the target perplexity.
    fn joint_affinities(&self, x: &Matrix) -> Result<Array2<f64>> {
        let dist = distance::pairwise_distances(x)?;
        let n = dist.nrows();
        let target_entropy = self.perplexity.ln();

        let mut conditional = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            let d2: Vec<f64> = dist
                .row(i)
                .iter()
                .map(|&v| {
                    let v = f64::from(v);
                    v * v
                })
                .collect();

            let mut beta = 1.0_f64;
            let mut beta_min = 0.0_f64;
            let mut beta_max = f64::INFINITY;
            let mut row = conditional_row(&d2, i, beta);
            for _ in 0..PERPLEXITY_SEARCH_STEPS {
                let gap = row.0 - target_entropy;
                if gap.abs() < ENTROPY_TOL {
                    break;
                }
                if gap > 0.0 {
                    // Entropy too high: sharpen the kernel.
                    beta_min = beta;
                    beta = if beta_max.is_finite() {
                        (beta + beta_max) / 2.0
                    } else {
                        beta * 2.0
                    };
                } else {
                    beta_max = beta;
                    beta = if beta_min > 0.0 {
                        (beta + beta_min) / 2.0
                    } else {
                        beta / 2.0
                    };
                }
                row = conditional_row(&d2, i, beta);
            }
            for (j, &p) in row.1.iter().enumerate() {
                conditional[[i, j]] = p;
            }
        }

        let mut joint = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let p = (conditional[[i, j]] + conditional[[j, i]]) / (2.0 * n as f64);
                    joint[[i, j]] = p.max(MIN_PROB);
                }
            }
        }
        Ok(joint)
    }

    fn optimize(&self, p: &Array2<f64>, n: usize) -> (Array2<f64>, f64) {
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut y =
            Array2::<f64>::random_using((n, 2), Uniform::new(-INIT_SPREAD, INIT_SPREAD), &mut rng);
        let mut velocity = Array2::<f64>::zeros((n, 2));
        let mut gains = Array2::<f64>::from_elem((n, 2), 1.0);

        for iter in 0..self.n_iter {
            // Early exaggeration inflates attraction so clusters form first.
            let p_scale = if iter < self.exaggeration_iter {
                self.early_exaggeration
            } else {
                1.0
            };

            let (kernel, q) = low_dim_affinities(&y);

            // dC/dy_i = 4 sum_j (p_ij - q_ij) kernel_ij (y_i - y_j)
            let mut grad = Array2::<f64>::zeros((n, 2));
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let coeff = 4.0 * (p_scale * p[[i, j]] - q[[i, j]]) * kernel[[i, j]];
                    for c in 0..2 {
                        grad[[i, c]] += coeff * (y[[i, c]] - y[[j, c]]);
                    }
                }
            }

            let momentum = if iter < MOMENTUM_SWITCH_ITER {
                INITIAL_MOMENTUM
            } else {
                FINAL_MOMENTUM
            };
            for i in 0..n {
                for c in 0..2 {
                    if (grad[[i, c]] > 0.0) != (velocity[[i, c]] > 0.0) {
                        gains[[i, c]] += 0.2;
                    } else {
                        gains[[i, c]] *= 0.8;
                    }
                    gains[[i, c]] = gains[[i, c]].max(MIN_GAIN);
                    velocity[[i, c]] =
                        momentum * velocity[[i, c]] - self.learning_rate * gains[[i, c]] * grad[[i, c]];
                    y[[i, c]] += velocity[[i, c]];
                }
            }

            // Keep the layout centered so it cannot drift.
            let centroid = y.mean_axis(Axis(0)).unwrap();
            y -= &centroid.view().insert_axis(Axis(0));

            if (iter + 1) % 100 == 0 {
                let kl = kl_divergence(p, &q);
                debug!(iteration = iter + 1, kl, "t-SNE optimization progress");
            }
        }

        let (_, q) = low_dim_affinities(&y);
        let kl = kl_divergence(p, &q);
        (y, kl)
    }
}

impl Default for TSNE {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized conditional distribution of row `i` at precision `beta`, with
/// its Shannon entropy in nats. Distances are shifted by the row minimum
/// before exponentiation so wide rows do not underflow to zero mass.
fn conditional_row(d2: &[f64], i: usize, beta: f64) -> (f64, Vec<f64>) {
    let n = d2.len();
    let shift = d2
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(_, &v)| v)
        .fold(f64::INFINITY, f64::min);

    let mut row = vec![0.0; n];
    let mut sum = 0.0;
    for (j, &v) in d2.iter().enumerate() {
        if j != i {
            let p = (-beta * (v - shift)).exp();
            row[j] = p;
            sum += p;
        }
    }

    if sum <= 0.0 || !sum.is_finite() {
        // Every pair underflowed; treat the row as uniform.
        let uniform = 1.0 / (n - 1) as f64;
        for (j, slot) in row.iter_mut().enumerate() {
            *slot = if j == i { 0.0 } else { uniform };
        }
        return (((n - 1) as f64).ln(), row);
    }

    let mut entropy = 0.0;
    for (j, slot) in row.iter_mut().enumerate() {
        if j != i {
            *slot /= sum;
            if *slot > MIN_PROB {
                entropy -= *slot * slot.ln();
            }
        }
    }
    (entropy, row)
}

/// Student-t kernel values and the normalized embedding-space distribution.
fn low_dim_affinities(y: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let n = y.nrows();
    let mut kernel = Array2::<f64>::zeros((n, n));
    let mut sum = 0.0;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = y[[i, 0]] - y[[j, 0]];
            let dy = y[[i, 1]] - y[[j, 1]];
            let k = 1.0 / (1.0 + dx * dx + dy * dy);
            kernel[[i, j]] = k;
            kernel[[j, i]] = k;
            sum += 2.0 * k;
        }
    }

    let mut q = Array2::<f64>::zeros((n, n));
    if sum > 0.0 {
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    q[[i, j]] = (kernel[[i, j]] / sum).max(MIN_PROB);
                }
            }
        }
    }
    (kernel, q)
}

fn kl_divergence(p: &Array2<f64>, q: &Array2<f64>) -> f64 {
    let n = p.nrows();
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j && p[[i, j]] > MIN_PROB {
                kl += p[[i, j]] * (p[[i, j]] / q[[i, j]]).ln();
            }
        }
    }
    kl
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_clusters() -> (Matrix, Vec<usize>) {
        // Five points around the origin, five around (50, 50, 50, 50).
        let x = array![
            [0.0_f32, 0.1, -0.1, 0.0],
            [0.2, 0.0, 0.1, -0.2],
            [-0.1, 0.2, 0.0, 0.1],
            [0.1, -0.1, 0.2, 0.0],
            [0.0, 0.0, -0.2, 0.2],
            [50.0, 50.1, 49.9, 50.0],
            [50.2, 50.0, 50.1, 49.8],
            [49.9, 50.2, 50.0, 50.1],
            [50.1, 49.9, 50.2, 50.0],
            [50.0, 50.0, 49.8, 50.2]
        ];
        let membership = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        (x, membership)
    }

    #[test]
    fn test_one_dimensional_input_is_duplicated() {
        let x = array![[1.0_f32], [2.0], [3.0]];
        let mut tsne = TSNE::new();
        let out = tsne.fit_transform(&x).unwrap();

        assert_eq!(out.shape(), &[3, 2]);
        for i in 0..3 {
            assert_eq!(out[[i, 0]], x[[i, 0]]);
            assert_eq!(out[[i, 1]], x[[i, 0]]);
        }
        assert!(tsne.kl_divergence.is_none());
    }

    #[test]
    fn test_two_dimensional_input_passes_through() {
        let x = array![[1.0_f32, -1.0], [2.0, 0.5], [0.0, 3.0]];
        let mut tsne = TSNE::new();
        let out = tsne.fit_transform(&x).unwrap();

        assert_eq!(out, x);
        assert!(tsne.kl_divergence.is_none());
    }

    #[test]
    fn test_single_sample_rejected() {
        let x = array![[1.0_f32, 2.0, 3.0]];
        let mut tsne = TSNE::new();
        assert!(matches!(
            tsne.fit_transform(&x),
            Err(EvalError::Shape(_))
        ));
    }

    #[test]
    fn test_oversized_perplexity_rejected() {
        let x = Matrix::zeros((4, 5));
        let mut tsne = TSNE::new().perplexity(30.0);
        assert!(matches!(
            tsne.fit_transform(&x),
            Err(EvalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let x = array![[1.0_f32, 2.0, 3.0], [f32::NAN, 0.0, 1.0]];
        let mut tsne = TSNE::new();
        assert!(matches!(
            tsne.fit_transform(&x),
            Err(EvalError::NonFinite(_))
        ));
    }

    #[test]
    fn test_embedding_shape_and_finiteness() {
        let (x, _) = two_clusters();
        let mut tsne = TSNE::new().perplexity(3.0).n_iter(400).random_state(7);
        let out = tsne.fit_transform(&x).unwrap();

        assert_eq!(out.shape(), &[10, 2]);
        assert!(out.iter().all(|v| v.is_finite()));
        assert!(tsne.kl_divergence.unwrap().is_finite());
    }

    #[test]
    fn test_clusters_stay_cohesive() {
        let (x, membership) = two_clusters();
        let mut tsne = TSNE::new().perplexity(3.0).n_iter(500).random_state(42);
        let out = tsne.fit_transform(&x).unwrap();

        let mut intra = (0.0_f64, 0usize);
        let mut inter = (0.0_f64, 0usize);
        for i in 0..10 {
            for j in (i + 1)..10 {
                let dx = f64::from(out[[i, 0]] - out[[j, 0]]);
                let dy = f64::from(out[[i, 1]] - out[[j, 1]]);
                let d = (dx * dx + dy * dy).sqrt();
                if membership[i] == membership[j] {
                    intra = (intra.0 + d, intra.1 + 1);
                } else {
                    inter = (inter.0 + d, inter.1 + 1);
                }
            }
        }
        let mean_intra = intra.0 / intra.1 as f64;
        let mean_inter = inter.0 / inter.1 as f64;
        assert!(
            mean_intra < mean_inter,
            "intra {} should be below inter {}",
            mean_intra,
            mean_inter
        );
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let (x, _) = two_clusters();

        let mut a = TSNE::new().perplexity(3.0).n_iter(300).random_state(11);
        let mut b = TSNE::new().perplexity(3.0).n_iter(300).random_state(11);

        let out_a = a.fit_transform(&x).unwrap();
        let out_b = b.fit_transform(&x).unwrap();
        assert_eq!(out_a, out_b);
    }
}
