// src/solver.rs

//! Main solver interface.

use crate::config::{
    default_block, default_lrate, RunicaConfig, MAX_LRATE, MIN_LRATE,
};
use crate::core;
use crate::error::{Result, RunicaError};
use crate::postprocess::{normalize_polarity, reorder_by_variance};
use crate::preprocess::{reduce, remove_mean, sphering_matrix};
use crate::result::RunicaResult;
use crate::rng;
use faer::{Mat, MatRef};

/// The Infomax/extended-Infomax ICA solver.
///
/// This struct provides static methods for running decompositions.
pub struct Runica;

impl Runica {
    /// Decompose with the default configuration.
    ///
    /// # Arguments
    /// * `x` - Data matrix of shape (channels, samples)
    pub fn fit(x: MatRef<'_, f64>) -> Result<RunicaResult> {
        Self::fit_with_config(x, &RunicaConfig::default())
    }

    /// Decompose with a custom configuration.
    ///
    /// Runs synchronously and blocks until convergence, the step cap, or a
    /// fatal failure. Check [`RunicaResult::converged`] (or the status
    /// field) before relying on the stop threshold having been met.
    pub fn fit_with_config(x: MatRef<'_, f64>, config: &RunicaConfig) -> Result<RunicaResult> {
        config.validate()?;

        let (channels, samples) = (x.nrows(), x.ncols());
        if channels < 2 || samples == 0 {
            return Err(RunicaError::InvalidDimensions {
                message: format!(
                    "need at least 2 channels and 1 sample, got {channels}x{samples}"
                ),
            });
        }

        // the solver owns a working copy; the caller's input stays intact
        let mut data = x.to_owned();
        let mean = remove_mean(&mut data);

        let pca_basis = match config.pca {
            Some(k) => {
                if k > channels {
                    return Err(RunicaError::InvalidDimensions {
                        message: format!(
                            "pca target ({k}) cannot exceed the channel count ({channels})"
                        ),
                    });
                }
                log::info!("reducing {channels} channels to {k} principal components");
                let (reduced, basis) = reduce(data.as_ref(), k)?;
                data = reduced;
                Some(basis)
            }
            None => None,
        };
        let ncomps = data.nrows();

        if config.nsub > ncomps {
            return Err(RunicaError::InvalidConfig {
                parameter: "nsub".into(),
                message: format!("cannot exceed the component count ({ncomps})"),
            });
        }

        let sphere = if config.sphering {
            log::info!("computing the sphering matrix");
            let sphere = sphering_matrix(data.as_ref())?;
            data = &sphere * &data;
            sphere
        } else {
            Mat::identity(ncomps, ncomps)
        };

        let lrate = config.lrate.unwrap_or_else(|| default_lrate(ncomps));
        if !(MIN_LRATE..=MAX_LRATE).contains(&lrate) {
            return Err(RunicaError::InvalidConfig {
                parameter: "lrate".into(),
                message: format!(
                    "derived rate {lrate:.3e} is outside [{MIN_LRATE:e}, {MAX_LRATE}]; \
                     set one explicitly"
                ),
            });
        }

        let block = config.block.unwrap_or_else(|| default_block(samples));
        if block < 2 || block > samples {
            return Err(RunicaError::InvalidConfig {
                parameter: "block".into(),
                message: format!("block ({block}) must lie in [2, {samples}]"),
            });
        }

        let w_start = match &config.w_init {
            Some(w) => {
                if w.nrows() != ncomps || w.ncols() != ncomps {
                    return Err(RunicaError::InvalidDimensions {
                        message: format!(
                            "w_init is {}x{}, expected {ncomps}x{ncomps}",
                            w.nrows(),
                            w.ncols()
                        ),
                    });
                }
                w.clone()
            }
            None => Mat::identity(ncomps, ncomps),
        };

        let mut source = rng::build_source(config.rng, config.seed);

        log::info!(
            "training {ncomps} components on {samples} samples \
             (block {block}, lrate {lrate:.5}, extended {})",
            config.extended
        );
        let outcome = core::train(data.as_ref(), config, source.as_mut(), w_start, lrate, block)?;

        if outcome.status == crate::result::ExitStatus::MaxStepsReached {
            log::warn!(
                "step cap ({}) reached with wchange {:.3e}; returning best estimate",
                config.maxsteps,
                outcome.wchange
            );
        }

        let mut weights = outcome.weights;
        let mut bias = outcome.bias;
        let mut acts = &weights * &data;

        if config.posact {
            normalize_polarity(&mut weights, &mut bias, &mut acts);
        }

        let mut signs = config.extended.then_some(outcome.signs);
        let order = reorder_by_variance(
            &mut weights,
            sphere.as_ref(),
            &mut bias,
            signs.as_mut(),
            &mut acts,
        )?;

        Ok(RunicaResult {
            weights,
            sphere,
            pca: pca_basis,
            mean,
            bias: config.bias.then_some(bias),
            signs,
            activations: acts,
            order,
            status: outcome.status,
            steps: outcome.steps,
            wchange: outcome.wchange,
            restarts: outcome.restarts,
            lrate: outcome.lrate,
        })
    }
}
