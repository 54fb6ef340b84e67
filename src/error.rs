// src/error.rs

//! Error types for the runica crate.

use thiserror::Error;

/// Errors that can occur while setting up or running the decomposition.
///
/// Reaching the step cap without meeting the stop threshold is *not* an
/// error; it is reported as [`ExitStatus::MaxStepsReached`] on the `Ok`
/// path so callers still get the best weights found.
///
/// [`ExitStatus::MaxStepsReached`]: crate::ExitStatus::MaxStepsReached
#[derive(Error, Debug, Clone)]
pub enum RunicaError {
    /// A configuration option is outside its valid range. Detected before
    /// any iteration; no partial output is produced.
    #[error("invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Name of the offending option.
        parameter: String,
        /// Why it was rejected.
        message: String,
    },

    /// Input or warm-start dimensions are unusable.
    #[error("invalid dimensions: {message}")]
    InvalidDimensions { message: String },

    /// The weight matrix kept blowing up and the restart policy ran out of
    /// retries (or annealed the learning rate through its floor).
    #[error(
        "weight matrix diverged after {restarts} restart(s); \
         learning rate {lrate:.3e} cannot be lowered further. \
         The data may be ill-conditioned or the initial lrate too large."
    )]
    NumericDivergence { restarts: usize, lrate: f64 },

    /// A matrix that must be inverted was singular to working precision.
    #[error("singular matrix encountered during computation")]
    SingularMatrix,

    /// The dense linear-algebra substrate could not decompose a matrix
    /// (typically an ill-conditioned covariance).
    #[error("linear algebra failure: {message}")]
    LinearAlgebraFailure { message: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RunicaError>;
