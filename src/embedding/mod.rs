//! Nonlinear 2-D embedding for visual inspection of feature spaces.
//!
//! This module provides `TSNE`: a neighbor-probability-preserving stochastic
//! embedding that keeps points close in feature space close in the plane.
//! Global distances are not preserved, only local neighborhoods.
//!
//! # Examples
//!
//! ```rust
//! use featbench::TSNE;
//! use ndarray::array;
//!
//! let x = array![
//!     [0.0_f32, 0.1, 0.0, -0.1],
//!     [0.1, 0.0, -0.1, 0.0],
//!     [0.0, -0.1, 0.1, 0.1],
//!     [5.0, 5.1, 5.0, 4.9],
//!     [5.1, 5.0, 4.9, 5.0],
//!     [4.9, 5.0, 5.1, 5.0]
//! ];
//!
//! let mut tsne = TSNE::new()
//!     .perplexity(2.0)
//!     .n_iter(300)
//!     .random_state(0);
//! let points = tsne.fit_transform(&x).unwrap();
//! assert_eq!(points.shape(), &[6, 2]);
//! ```

mod tsne;

pub use tsne::TSNE;
