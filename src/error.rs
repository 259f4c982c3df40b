//! Error types shared by all evaluation components.

use thiserror::Error;

/// Result type alias for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating feature representations.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Dimension or count mismatch between a matrix, labels, or a declared row width.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Insufficient samples or zero variance where a fit requires spread-out data.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// NaN or infinity encountered where a finite value is required.
    #[error("non-finite value: {0}")]
    NonFinite(String),

    /// Parameter outside its documented domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation needs a fitted model.
    #[error("model not fitted. Call fit() first")]
    NotFitted,

    /// Boundary-file read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents do not match the expected binary or text layout.
    #[error("malformed file: {0}")]
    MalformedFile(String),
}
