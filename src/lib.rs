// src/lib.rs

//! # Runica
//!
//! Independent Component Analysis by adaptive natural-gradient Infomax,
//! with the extended-Infomax variant for mixed super- and sub-Gaussian
//! sources:
//!
//! > Anthony J. Bell, Terrence J. Sejnowski.
//! > "An information-maximization approach to blind separation and blind deconvolution"
//! > Neural Computation, 1995
//!
//! > Te-Won Lee, Mark Girolami, Terrence J. Sejnowski.
//! > "Independent component analysis using an extended infomax algorithm
//! > for mixed subgaussian and supergaussian sources"
//! > Neural Computation, 1999
//!
//! Input data is mean-centered, optionally PCA-reduced, and sphered
//! before training. The unmixing matrix is optimized in shuffled data
//! blocks with learning-rate annealing, optional momentum, and automatic
//! restart on divergence. Output components are polarity-normalized and
//! ordered by descending variance contribution.
//!
//! ## Example
//!
//! ```rust,no_run
//! use runica::{Runica, RunicaConfig};
//! use faer::Mat;
//!
//! # fn main() -> Result<(), runica::RunicaError> {
//! // Data matrix of shape (channels x samples)
//! let x = Mat::<f64>::zeros(10, 1000);
//!
//! // Decompose with default settings
//! let result = Runica::fit(x.as_ref())?;
//!
//! // Or with custom configuration
//! let config = RunicaConfig::builder()
//!     .extended(true)
//!     .pca(8)
//!     .seed(42)
//!     .build();
//! let result = Runica::fit_with_config(x.as_ref(), &config)?;
//!
//! // Access results
//! let activations = &result.activations;
//! let unmixing = result.full_unmixing();
//! # Ok(())
//! # }
//! ```

mod config;
mod core;
mod error;
mod math;
mod postprocess;
mod preprocess;
mod result;
mod rng;
mod signs;
mod solver;

pub use config::{
    ConfigBuilder, RunicaConfig, MAX_LRATE, MAX_PDFSIZE, MAX_WEIGHT, MIN_LRATE, MIN_PDFSIZE,
};
pub use error::RunicaError;
pub use result::{ExitStatus, RunicaResult};
pub use rng::RngKind;
pub use signs::SignEstimator;
pub use solver::Runica;

// Re-export faer for convenience
pub use faer;
