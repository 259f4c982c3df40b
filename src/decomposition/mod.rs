//! Linear dimensionality reduction.
//!
//! This module provides `PCA`: principal component analysis fitted by an
//! explicit power-iteration eigendecomposition, with a flat binary model
//! format for reuse across processes.
//!
//! # Examples
//!
//! ## Fitting and projecting
//! ```rust
//! use featbench::{PCA, Matrix};
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0_f32, 2.0, 3.0],
//!     [4.0, 5.0, 7.0],
//!     [7.0, 8.0, 8.0],
//!     [10.0, 11.0, 14.0]
//! ];
//!
//! let mut pca = PCA::new().n_components(2);
//! let reduced = pca.fit_transform(&x).unwrap();
//! assert_eq!(reduced.shape(), &[4, 2]);
//!
//! let explained = pca.explained_variance_ratio.as_ref().unwrap();
//! println!("Explained variance ratio: {:?}", explained);
//! ```
//!
//! ## Reusing a fitted model
//! ```rust
//! use featbench::PCA;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0_f32, 2.0, 3.0],
//!     [4.0, 5.0, 7.0],
//!     [7.0, 8.0, 8.0],
//!     [10.0, 11.0, 14.0]
//! ];
//!
//! let mut pca = PCA::new().n_components(2);
//! pca.fit(&x).unwrap();
//!
//! // Negated mean then component rows, little-endian f32.
//! let mut bytes = Vec::new();
//! pca.write_to(&mut bytes).unwrap();
//!
//! let reloaded = PCA::read_from(&mut &bytes[..], 3).unwrap();
//! let projected = reloaded.transform(&x).unwrap();
//! assert_eq!(projected.shape(), &[4, 2]);
//! ```

mod pca;

pub use pca::PCA;
