// src/core.rs

//! Core Infomax/extended-Infomax training loop.
//!
//! One "step" is a full pass over the data in shuffled blocks. Within a
//! pass the weight matrix takes a natural-gradient update per block; after
//! each pass the loop measures the weight change, anneals the learning
//! rate when the update direction starts oscillating, restarts from the
//! initial weights when the matrix blows up, and stops on convergence or
//! the step cap.

use crate::config::{RunicaConfig, MAX_WEIGHT, MIN_LRATE};
use crate::error::{Result, RunicaError};
use crate::math::{dot_flat, frob_sq, max_abs};
use crate::result::ExitStatus;
use crate::rng::{randperm, UniformSource};
use crate::signs::{self, SignState};
use faer::{Col, Mat, MatRef};

const DEGCONST: f64 = 180.0 / std::f64::consts::PI;
/// Restart budget on top of the learning-rate floor.
const MAX_RESTARTS: usize = 128;

/// Everything the solver hands back to the orchestrator.
pub(crate) struct TrainOutcome {
    pub weights: Mat<f64>,
    pub bias: Col<f64>,
    pub signs: Col<f64>,
    pub status: ExitStatus,
    pub steps: usize,
    pub wchange: f64,
    pub restarts: usize,
    pub lrate: f64,
}

/// Mutable per-run solver state threaded through the loop.
struct TrainingState {
    lrate: f64,
    step: usize,
    blockno: usize,
    restarts: usize,
    /// Weight-change magnitude of the most recent step.
    wchange: f64,
    /// Previous total weight delta, for momentum.
    prev_delta: Mat<f64>,
    /// Weight snapshot backing the momentum delta.
    prev_weights: Mat<f64>,
    /// Retained delta and change for the annealing angle.
    olddelta: Option<Mat<f64>>,
    oldchange: f64,
}

impl TrainingState {
    fn new(lrate: f64, weights: &Mat<f64>) -> Self {
        let n = weights.nrows();
        Self {
            lrate,
            step: 0,
            blockno: 1,
            restarts: 0,
            wchange: 0.0,
            prev_delta: Mat::zeros(n, n),
            prev_weights: weights.clone(),
            olddelta: None,
            oldchange: 0.0,
        }
    }

}

/// Run the training loop on sphered, mean-removed data.
///
/// `data` is components × samples; `w_start` is the square initial weight
/// matrix. The learning rate and block length have already been derived
/// and validated by the entry point.
pub(crate) fn train(
    data: MatRef<'_, f64>,
    config: &RunicaConfig,
    rng: &mut dyn UniformSource,
    w_start: Mat<f64>,
    lrate: f64,
    block: usize,
) -> Result<TrainOutcome> {
    let ncomps = data.nrows();
    let samples = data.ncols();
    let block_f = block as f64;
    let anneal = config.effective_annealstep();

    let mut weights = w_start.clone();
    let mut old_weights = weights.clone();
    let mut bias = Col::<f64>::zeros(ncomps);
    let mut signs = initial_signs(ncomps, config.nsub);
    let mut state = TrainingState::new(lrate, &weights);
    let mut sign_state = SignState::new(ncomps, config, samples);

    let mut status = ExitStatus::MaxStepsReached;

    while state.step < config.maxsteps {
        let perm = randperm(samples, rng);
        let mut blowup = false;

        let mut t = 0;
        while t + block <= samples {
            let xb = Mat::from_fn(ncomps, block, |i, j| data[(i, perm[t + j])]);

            // u = W·x + bias
            let mut u = &weights * &xb;
            if config.bias {
                for j in 0..block {
                    for i in 0..ncomps {
                        u[(i, j)] += bias[i];
                    }
                }
            }

            let grad = if config.extended {
                extended_gradient(&u, &signs, block_f)
            } else {
                logistic_gradient(&u, block_f)
            };

            if config.bias {
                update_bias(&mut bias, &u, state.lrate, config.extended);
            }

            // W += lrate·grad·W, then the momentum carry-over
            let delta = &grad * &weights;
            for j in 0..ncomps {
                for i in 0..ncomps {
                    weights[(i, j)] += state.lrate * delta[(i, j)];
                }
            }
            if config.momentum > 0.0 {
                for j in 0..ncomps {
                    for i in 0..ncomps {
                        weights[(i, j)] += config.momentum * state.prev_delta[(i, j)];
                    }
                }
                state.prev_delta = &weights - &state.prev_weights;
                state.prev_weights = weights.clone();
            }

            if max_abs(weights.as_ref()) > MAX_WEIGHT {
                blowup = true;
                break;
            }

            if config.extended && state.blockno % config.extblocks == 0 {
                let window = sign_state.pdfsize.min(samples);
                let tail = data.submatrix(0, samples - window, ncomps, window);
                let acts = &weights * tail;
                signs::estimate(config, acts.as_ref(), &mut signs, &mut sign_state, samples);
            }
            state.blockno += 1;

            t += block;
        }

        let wtchange = &weights - &old_weights;
        let change = frob_sq(wtchange.as_ref());

        if blowup || !change.is_finite() {
            state.restarts += 1;
            state.lrate *= config.restart_fac;
            log::warn!(
                "weight matrix blew up; restart {} with lrate {:.3e}",
                state.restarts,
                state.lrate
            );
            if state.lrate < MIN_LRATE || state.restarts > MAX_RESTARTS {
                return Err(RunicaError::NumericDivergence {
                    restarts: state.restarts,
                    lrate: state.lrate,
                });
            }

            // roll everything back to the initial state; the step counter
            // keeps counting so maxsteps bounds total work
            weights = w_start.clone();
            old_weights = w_start.clone();
            bias = Col::zeros(ncomps);
            signs = initial_signs(ncomps, config.nsub);
            state.prev_delta = Mat::zeros(ncomps, ncomps);
            state.prev_weights = weights.clone();
            state.olddelta = None;
            state.oldchange = 0.0;
            state.blockno = 1;
            sign_state.reset(config, samples);
            continue;
        }

        state.step += 1;
        state.wchange = change;

        let mut angledelta = 0.0;
        if state.step > 2 {
            if let Some(olddelta) = &state.olddelta {
                let denom = (change * state.oldchange).sqrt();
                if denom > 0.0 {
                    let cos = (dot_flat(wtchange.as_ref(), olddelta.as_ref()) / denom)
                        .clamp(-1.0, 1.0);
                    angledelta = cos.acos() * DEGCONST;
                }
            }
        }

        if config.verbose {
            log::info!(
                "step {} - lrate {:.7}, wchange {:.8e}, angledelta {:.1} deg",
                state.step,
                state.lrate,
                change,
                angledelta
            );
        } else {
            log::debug!(
                "step {} - lrate {:.7}, wchange {:.8e}, angledelta {:.1} deg",
                state.step,
                state.lrate,
                change,
                angledelta
            );
        }

        if angledelta > config.annealdeg {
            state.lrate *= anneal;
            state.olddelta = Some(wtchange.clone());
            state.oldchange = change;
        } else if state.step == 1 {
            state.olddelta = Some(wtchange.clone());
            state.oldchange = change;
        }

        old_weights = weights.clone();

        if state.step > 2 && change < config.nochange {
            status = ExitStatus::Converged;
            break;
        }
        if state.lrate < MIN_LRATE {
            status = ExitStatus::Converged;
            break;
        }
        if change > config.blowup {
            state.lrate *= config.blowup_fac;
        }
    }

    Ok(TrainOutcome {
        weights,
        bias,
        signs,
        status,
        steps: state.step,
        wchange: state.wchange,
        restarts: state.restarts,
        lrate: state.lrate,
    })
}

fn initial_signs(ncomps: usize, nsub: usize) -> Col<f64> {
    Col::from_fn(ncomps, |i| if i < nsub { -1.0 } else { 1.0 })
}

/// Natural-gradient factor for the logistic nonlinearity:
/// `block·I + (1−2y)·uᵀ` with `y = 1/(1+e^{-u})`.
fn logistic_gradient(u: &Mat<f64>, block: f64) -> Mat<f64> {
    let (n, t) = (u.nrows(), u.ncols());
    let yy = Mat::from_fn(n, t, |i, j| 1.0 - 2.0 / (1.0 + (-u[(i, j)]).exp()));

    let mut grad = &yy * u.transpose();
    for i in 0..n {
        grad[(i, i)] += block;
    }
    grad
}

/// Natural-gradient factor for the sign-switched tanh nonlinearity:
/// `block·I − diag(signs)·tanh(u)·uᵀ − u·uᵀ`.
fn extended_gradient(u: &Mat<f64>, signs: &Col<f64>, block: f64) -> Mat<f64> {
    let (n, t) = (u.nrows(), u.ncols());
    let y = Mat::from_fn(n, t, |i, j| u[(i, j)].tanh());

    let yu = &y * u.transpose();
    let uu = u * u.transpose();

    Mat::from_fn(n, n, |i, j| {
        let diag = if i == j { block } else { 0.0 };
        diag - signs[i] * yu[(i, j)] - uu[(i, j)]
    })
}

fn update_bias(bias: &mut Col<f64>, u: &Mat<f64>, lrate: f64, extended: bool) {
    let (n, t) = (u.nrows(), u.ncols());
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..t {
            if extended {
                sum += -2.0 * u[(i, j)].tanh();
            } else {
                sum += 1.0 - 2.0 / (1.0 + (-u[(i, j)]).exp());
            }
        }
        bias[i] += lrate * sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_block;
    use crate::preprocess::{remove_mean, sphering_matrix};
    use crate::rng::Shift250;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn mixed_laplacian(ncomps: usize, samples: usize, seed: u64) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let sources = Mat::from_fn(ncomps, samples, |_, _| {
            let u: f64 = rng.random_range(0.0..1.0);
            let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
            sign * -(1.0 - u).ln()
        });
        let mixing = Mat::from_fn(ncomps, ncomps, |i, j| {
            1.0 + 0.5 * ((i * ncomps + j) as f64).sin()
        });
        &mixing * &sources
    }

    fn sphered(mut data: Mat<f64>) -> Mat<f64> {
        remove_mean(&mut data);
        let sphere = sphering_matrix(data.as_ref()).unwrap();
        &sphere * &data
    }

    fn run(data: &Mat<f64>, config: &RunicaConfig, seed: u32) -> TrainOutcome {
        let n = data.nrows();
        let block = default_block(data.ncols());
        let lrate = 0.015 / (n as f64).ln();
        let mut rng = Shift250::new(seed);
        train(
            data.as_ref(),
            config,
            &mut rng,
            Mat::identity(n, n),
            lrate,
            block,
        )
        .unwrap()
    }

    #[test]
    fn training_is_seed_reproducible() {
        let data = sphered(mixed_laplacian(3, 3000, 17));
        let config = RunicaConfig::builder().maxsteps(20).build();

        let a = run(&data, &config, 77);
        let b = run(&data, &config, 77);

        for i in 0..3 {
            for j in 0..3 {
                assert!((a.weights[(i, j)] - b.weights[(i, j)]).abs() < 1e-12);
            }
        }
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.restarts, b.restarts);
    }

    #[test]
    fn different_seeds_shuffle_differently() {
        let data = sphered(mixed_laplacian(3, 3000, 17));
        let config = RunicaConfig::builder().maxsteps(5).build();

        let a = run(&data, &config, 1);
        let b = run(&data, &config, 2);

        let mut identical = true;
        for i in 0..3 {
            for j in 0..3 {
                if (a.weights[(i, j)] - b.weights[(i, j)]).abs() > 1e-12 {
                    identical = false;
                }
            }
        }
        assert!(!identical);
    }

    #[test]
    fn weight_change_decreases_toward_convergence() {
        let data = sphered(mixed_laplacian(3, 4000, 5));
        let config = RunicaConfig::default();
        let outcome = run(&data, &config, 9);

        assert!(outcome.wchange.is_finite());
        assert!(outcome.steps > 2);
        // annealed rate never leaves its bounds
        assert!(outcome.lrate <= 0.015 / 3f64.ln());
    }

    #[test]
    fn extreme_scaling_triggers_restart_or_typed_failure() {
        // unsphered data with enormous amplitude forces a blow-up
        let raw = mixed_laplacian(3, 2000, 31);
        let mut data = Mat::from_fn(3, 2000, |i, j| raw[(i, j)] * 1e6);
        remove_mean(&mut data);

        let config = RunicaConfig::builder().maxsteps(40).lrate(0.09).build();
        let block = default_block(2000);
        let mut rng = Shift250::new(3);
        let result = train(
            data.as_ref(),
            &config,
            &mut rng,
            Mat::identity(3, 3),
            0.09,
            block,
        );

        match result {
            Ok(outcome) => {
                assert!(outcome.restarts >= 1);
                assert!(outcome.lrate < 0.09);
                for j in 0..3 {
                    for i in 0..3 {
                        assert!(outcome.weights[(i, j)].is_finite());
                    }
                }
            }
            Err(RunicaError::NumericDivergence { restarts, .. }) => {
                assert!(restarts >= 1);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn momentum_changes_the_trajectory() {
        let data = sphered(mixed_laplacian(3, 3000, 13));
        let plain = RunicaConfig::builder().maxsteps(10).build();
        let with_momentum = RunicaConfig::builder().maxsteps(10).momentum(0.5).build();

        let a = run(&data, &plain, 21);
        let b = run(&data, &with_momentum, 21);

        let mut identical = true;
        for i in 0..3 {
            for j in 0..3 {
                if (a.weights[(i, j)] - b.weights[(i, j)]).abs() > 1e-12 {
                    identical = false;
                }
            }
        }
        assert!(!identical);
    }
}
