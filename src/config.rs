// src/config.rs

//! Configuration for the Infomax/extended-Infomax solver.

use crate::error::{Result, RunicaError};
use crate::rng::RngKind;
use crate::signs::SignEstimator;
use faer::Mat;

/// Smallest learning rate the solver will iterate with.
pub const MIN_LRATE: f64 = 1e-6;
/// Largest learning rate accepted at configuration time.
pub const MAX_LRATE: f64 = 0.1;
/// Any weight entry beyond this magnitude counts as a blow-up.
pub const MAX_WEIGHT: f64 = 1e8;
/// Lower bound on the sign-estimation sample window.
pub const MIN_PDFSIZE: usize = 2000;
/// Upper bound on the sign-estimation sample window.
pub const MAX_PDFSIZE: usize = 6000;

/// Default initial learning rate for `ncomps` retained components.
pub(crate) fn default_lrate(ncomps: usize) -> f64 {
    0.015 / (ncomps as f64).ln()
}

/// Default gradient block length for `samples` frames.
pub(crate) fn default_block(samples: usize) -> usize {
    (samples as f64 / 3.0).sqrt().floor() as usize
}

/// Configuration parameters for a decomposition run.
///
/// Defaults reproduce the classic Infomax setup: logistic nonlinearity,
/// bias on, sphering on, polarity normalization on, extended mode off.
#[derive(Clone, Debug)]
pub struct RunicaConfig {
    /// Extended-ICA mode: per-component sign-switched nonlinearity with
    /// online higher-moment sign estimation.
    pub extended: bool,

    /// Blocks between sign re-estimation in extended mode.
    pub extblocks: usize,

    /// Number of components whose sign starts out sub-Gaussian (−1) in
    /// extended mode. All remaining signs start at +1.
    pub nsub: usize,

    /// Learn a per-component bias term alongside the weights.
    pub bias: bool,

    /// Reduce to this many principal components before sphering.
    /// `None` keeps every channel.
    pub pca: Option<usize>,

    /// Whiten the data with `2·C^(-1/2)` before training.
    pub sphering: bool,

    /// Flip component polarities so the dominant-magnitude activation
    /// sample of each component is positive.
    pub posact: bool,

    /// Samples per gradient step. `None` derives `floor(sqrt(samples/3))`.
    pub block: Option<usize>,

    /// Initial learning rate. `None` derives `0.015/ln(ncomps)`. Must lie
    /// in `[MIN_LRATE, MAX_LRATE]`.
    pub lrate: Option<f64>,

    /// Annealing angle threshold in degrees.
    pub annealdeg: f64,

    /// Learning-rate factor applied when annealing (non-extended).
    pub annealstep: f64,

    /// Learning-rate factor applied when annealing in extended mode.
    pub extanneal: f64,

    /// Momentum applied to the weight update from the previous delta.
    pub momentum: f64,

    /// Smoothing factor on successive higher-moment estimates.
    pub extmomentum: f64,

    /// Hard cap on training steps (passes over the data).
    pub maxsteps: usize,

    /// Stop threshold on the squared Frobenius weight change per step.
    pub nochange: f64,

    /// Higher-moment statistic used to classify source densities.
    pub estimator: SignEstimator,

    /// Dead zone around zero inside which a component's sign is left
    /// unchanged. `None` derives 0.02 for the kurtosis estimator and 0.0
    /// for the tanh-moment estimator.
    pub signsbias: Option<f64>,

    /// Weight-change magnitude beyond which the learning rate is cut.
    pub blowup: f64,

    /// Learning-rate factor applied when `wchange` exceeds `blowup`.
    pub blowup_fac: f64,

    /// Learning-rate factor applied on each divergence restart.
    pub restart_fac: f64,

    /// Consecutive stable sign decisions required before the estimation
    /// window is allowed to grow.
    pub signcount_threshold: usize,

    /// Growth factor for the sign-estimation window.
    pub signcount_step: usize,

    /// Initial sign-estimation window size. `None` starts at
    /// `MIN_PDFSIZE`; always clipped into `[MIN_PDFSIZE, MAX_PDFSIZE]`
    /// and the sample count.
    pub pdfsize: Option<usize>,

    /// Warm-start unmixing matrix. `None` starts from identity.
    pub w_init: Option<Mat<f64>>,

    /// Uniform generator used for block-order shuffling.
    pub rng: RngKind,

    /// Seed for the shuffling generator. `None` draws entropy.
    pub seed: Option<u64>,

    /// Emit per-step progress at `info` level instead of `debug`.
    pub verbose: bool,
}

impl Default for RunicaConfig {
    fn default() -> Self {
        Self {
            extended: false,
            extblocks: 1,
            nsub: 0,
            bias: true,
            pca: None,
            sphering: true,
            posact: true,
            block: None,
            lrate: None,
            annealdeg: 60.0,
            annealstep: 0.90,
            extanneal: 0.98,
            momentum: 0.0,
            extmomentum: 0.5,
            maxsteps: 512,
            nochange: 1e-6,
            estimator: SignEstimator::Kurtosis,
            signsbias: None,
            blowup: 1e9,
            blowup_fac: 0.8,
            restart_fac: 0.9,
            signcount_threshold: 25,
            signcount_step: 2,
            pdfsize: None,
            w_init: None,
            rng: RngKind::Shift250,
            seed: None,
            verbose: false,
        }
    }
}

impl RunicaConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for constructing a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Dead zone actually used by the sign estimator.
    pub fn effective_signsbias(&self) -> f64 {
        self.signsbias.unwrap_or(match self.estimator {
            SignEstimator::Kurtosis => 0.02,
            SignEstimator::TanhMoments => 0.0,
        })
    }

    /// Annealing factor actually used by the solver.
    pub fn effective_annealstep(&self) -> f64 {
        if self.extended {
            self.extanneal
        } else {
            self.annealstep
        }
    }

    /// Validate every option range that does not depend on the data shape.
    ///
    /// Shape-dependent checks (block vs. sample count, PCA target vs.
    /// channel count, derived learning rate) happen in the entry point
    /// once dimensions are known.
    pub fn validate(&self) -> Result<()> {
        if self.maxsteps == 0 {
            return Err(invalid("maxsteps", "must be greater than 0"));
        }
        if self.nochange <= 0.0 {
            return Err(invalid("nochange", "must be positive"));
        }
        if let Some(lrate) = self.lrate {
            if !(MIN_LRATE..=MAX_LRATE).contains(&lrate) {
                return Err(invalid(
                    "lrate",
                    &format!("must lie in [{MIN_LRATE:e}, {MAX_LRATE}]"),
                ));
            }
        }
        if let Some(block) = self.block {
            if block < 2 {
                return Err(invalid("block", "must be at least 2 samples"));
            }
        }
        if !(0.0..=180.0).contains(&self.annealdeg) {
            return Err(invalid("annealdeg", "must lie in [0, 180] degrees"));
        }
        if !(0.0..1.0).contains(&self.annealstep) || self.annealstep <= 0.0 {
            return Err(invalid("annealstep", "must lie in (0, 1)"));
        }
        if !(0.0..1.0).contains(&self.extanneal) || self.extanneal <= 0.0 {
            return Err(invalid("extanneal", "must lie in (0, 1)"));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(invalid("momentum", "must lie in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.extmomentum) {
            return Err(invalid("extmomentum", "must lie in [0, 1)"));
        }
        if self.blowup <= 0.0 {
            return Err(invalid("blowup", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.blowup_fac) || self.blowup_fac <= 0.0 {
            return Err(invalid("blowup_fac", "must lie in (0, 1)"));
        }
        if !(0.0..1.0).contains(&self.restart_fac) || self.restart_fac <= 0.0 {
            return Err(invalid("restart_fac", "must lie in (0, 1)"));
        }
        if self.extblocks == 0 {
            return Err(invalid("extblocks", "must be at least 1"));
        }
        if self.signcount_threshold == 0 {
            return Err(invalid("signcount_threshold", "must be at least 1"));
        }
        if self.signcount_step < 2 {
            return Err(invalid("signcount_step", "must be at least 2"));
        }
        if let Some(bias) = self.signsbias {
            if bias < 0.0 {
                return Err(invalid("signsbias", "must be non-negative"));
            }
        }
        if let Some(pdfsize) = self.pdfsize {
            if !(MIN_PDFSIZE..=MAX_PDFSIZE).contains(&pdfsize) {
                return Err(invalid(
                    "pdfsize",
                    &format!("must lie in [{MIN_PDFSIZE}, {MAX_PDFSIZE}]"),
                ));
            }
        }
        if let Some(k) = self.pca {
            if k < 2 {
                return Err(invalid("pca", "must retain at least 2 components"));
            }
        }
        Ok(())
    }
}

fn invalid(parameter: &str, message: &str) -> RunicaError {
    RunicaError::InvalidConfig {
        parameter: parameter.into(),
        message: message.into(),
    }
}

/// Builder for constructing [`RunicaConfig`] with a fluent API.
#[derive(Default)]
pub struct ConfigBuilder {
    config: RunicaConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: RunicaConfig::default(),
        }
    }

    /// Enable or disable extended-ICA mode.
    pub fn extended(mut self, extended: bool) -> Self {
        self.config.extended = extended;
        self
    }

    /// Set the number of blocks between sign re-estimations.
    pub fn extblocks(mut self, extblocks: usize) -> Self {
        self.config.extblocks = extblocks;
        self
    }

    /// Set how many components start with a sub-Gaussian sign.
    pub fn nsub(mut self, nsub: usize) -> Self {
        self.config.nsub = nsub;
        self
    }

    /// Enable or disable the bias term.
    pub fn bias(mut self, bias: bool) -> Self {
        self.config.bias = bias;
        self
    }

    /// Reduce to `k` principal components before sphering.
    pub fn pca(mut self, k: usize) -> Self {
        self.config.pca = Some(k);
        self
    }

    /// Enable or disable sphering.
    pub fn sphering(mut self, sphering: bool) -> Self {
        self.config.sphering = sphering;
        self
    }

    /// Enable or disable polarity normalization.
    pub fn posact(mut self, posact: bool) -> Self {
        self.config.posact = posact;
        self
    }

    /// Set the gradient block length.
    pub fn block(mut self, block: usize) -> Self {
        self.config.block = Some(block);
        self
    }

    /// Set the initial learning rate.
    pub fn lrate(mut self, lrate: f64) -> Self {
        self.config.lrate = Some(lrate);
        self
    }

    /// Set the annealing angle threshold in degrees.
    pub fn annealdeg(mut self, annealdeg: f64) -> Self {
        self.config.annealdeg = annealdeg;
        self
    }

    /// Set the annealing factor.
    pub fn annealstep(mut self, annealstep: f64) -> Self {
        self.config.annealstep = annealstep;
        self
    }

    /// Set the extended-mode annealing factor.
    pub fn extanneal(mut self, extanneal: f64) -> Self {
        self.config.extanneal = extanneal;
        self
    }

    /// Set the weight-update momentum.
    pub fn momentum(mut self, momentum: f64) -> Self {
        self.config.momentum = momentum;
        self
    }

    /// Set the higher-moment estimate smoothing factor.
    pub fn extmomentum(mut self, extmomentum: f64) -> Self {
        self.config.extmomentum = extmomentum;
        self
    }

    /// Set the hard step cap.
    pub fn maxsteps(mut self, maxsteps: usize) -> Self {
        self.config.maxsteps = maxsteps;
        self
    }

    /// Set the convergence threshold on weight change.
    pub fn nochange(mut self, nochange: f64) -> Self {
        self.config.nochange = nochange;
        self
    }

    /// Select the higher-moment sign estimator.
    pub fn estimator(mut self, estimator: SignEstimator) -> Self {
        self.config.estimator = estimator;
        self
    }

    /// Set the sign-decision dead zone.
    pub fn signsbias(mut self, signsbias: f64) -> Self {
        self.config.signsbias = Some(signsbias);
        self
    }

    /// Set the weight-change blow-up threshold.
    pub fn blowup(mut self, blowup: f64) -> Self {
        self.config.blowup = blowup;
        self
    }

    /// Set the learning-rate factor for over-threshold weight changes.
    pub fn blowup_fac(mut self, blowup_fac: f64) -> Self {
        self.config.blowup_fac = blowup_fac;
        self
    }

    /// Set the learning-rate factor applied on restart.
    pub fn restart_fac(mut self, restart_fac: f64) -> Self {
        self.config.restart_fac = restart_fac;
        self
    }

    /// Set the stability threshold for window growth.
    pub fn signcount_threshold(mut self, threshold: usize) -> Self {
        self.config.signcount_threshold = threshold;
        self
    }

    /// Set the window growth factor.
    pub fn signcount_step(mut self, step: usize) -> Self {
        self.config.signcount_step = step;
        self
    }

    /// Set the initial sign-estimation window size.
    pub fn pdfsize(mut self, pdfsize: usize) -> Self {
        self.config.pdfsize = Some(pdfsize);
        self
    }

    /// Provide a warm-start unmixing matrix.
    pub fn w_init(mut self, w_init: Mat<f64>) -> Self {
        self.config.w_init = Some(w_init);
        self
    }

    /// Select the uniform generator used for shuffling.
    pub fn rng(mut self, rng: RngKind) -> Self {
        self.config.rng = rng;
        self
    }

    /// Set the shuffling seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Enable or disable verbose progress output.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RunicaConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<RunicaConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
