// src/signs.rs

//! Higher-moment source-density classification for extended mode.
//!
//! Each component is modeled as either super-Gaussian (sign +1, peaked
//! density) or sub-Gaussian (sign −1, flat density). The classification
//! comes from a higher-moment statistic over a sliding sample window; two
//! interchangeable statistics are available, selected once at
//! configuration time.

use crate::config::{RunicaConfig, MAX_PDFSIZE, MIN_PDFSIZE};
use faer::{Col, MatRef};

/// Higher-moment statistic used to classify a component's density shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignEstimator {
    /// Normalized fourth moment: `k = E[u⁴]/E[u²]² − 3`.
    Kurtosis,
    /// Saturating-nonlinearity moments:
    /// `k = E[sech²(u)]·E[u²] − E[u·tanh(u)]`.
    TanhMoments,
}

impl SignEstimator {
    /// Per-component statistic over a components × window activation
    /// slice. Positive values indicate a super-Gaussian density.
    pub fn statistic(&self, acts: MatRef<'_, f64>) -> Col<f64> {
        let (n, t) = (acts.nrows(), acts.ncols());
        let t_f = t as f64;

        Col::from_fn(n, |i| match self {
            SignEstimator::Kurtosis => {
                let mut m2 = 0.0;
                let mut m4 = 0.0;
                for j in 0..t {
                    let u = acts[(i, j)];
                    let u2 = u * u;
                    m2 += u2;
                    m4 += u2 * u2;
                }
                m2 /= t_f;
                m4 /= t_f;
                if m2 > 0.0 {
                    m4 / (m2 * m2) - 3.0
                } else {
                    0.0
                }
            }
            SignEstimator::TanhMoments => {
                let mut sech2 = 0.0;
                let mut m2 = 0.0;
                let mut utanh = 0.0;
                for j in 0..t {
                    let u = acts[(i, j)];
                    let th = u.tanh();
                    sech2 += 1.0 - th * th;
                    m2 += u * u;
                    utanh += u * th;
                }
                (sech2 / t_f) * (m2 / t_f) - utanh / t_f
            }
        })
    }
}

/// Mutable estimation state carried across invocations.
pub(crate) struct SignState {
    /// Consecutive stable decisions per component.
    pub counts: Vec<usize>,
    /// Current estimation window length in samples.
    pub pdfsize: usize,
    /// Smoothed statistic from the previous invocation.
    pub old_stat: Option<Col<f64>>,
}

impl SignState {
    pub fn new(ncomps: usize, config: &RunicaConfig, samples: usize) -> Self {
        Self {
            counts: vec![0; ncomps],
            pdfsize: clip_window(config.pdfsize.unwrap_or(MIN_PDFSIZE), samples),
            old_stat: None,
        }
    }

    pub fn reset(&mut self, config: &RunicaConfig, samples: usize) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.pdfsize = clip_window(config.pdfsize.unwrap_or(MIN_PDFSIZE), samples);
        self.old_stat = None;
    }
}

fn clip_window(pdfsize: usize, samples: usize) -> usize {
    pdfsize.clamp(MIN_PDFSIZE, MAX_PDFSIZE).min(samples)
}

/// Re-estimate the sign vector from the most recent `state.pdfsize`
/// activation samples and merge the decisions in place.
///
/// `acts` may be the full activation matrix or just its tail;
/// `total_samples` is the recording length, which bounds window growth.
/// Decisions inside the `signsbias` dead zone leave the component's sign
/// unchanged so marginal statistics cannot flap it. Once every component
/// has been stable for `signcount_threshold` consecutive invocations, the
/// window grows by the configured factor (clipped to its bounds and
/// `total_samples`) and the counters reset. Never fails.
pub(crate) fn estimate(
    config: &RunicaConfig,
    acts: MatRef<'_, f64>,
    signs: &mut Col<f64>,
    state: &mut SignState,
    total_samples: usize,
) {
    let n = acts.nrows();
    let window = state.pdfsize.min(acts.ncols());
    let start = acts.ncols() - window;
    let recent = acts.submatrix(0, start, n, window);

    let mut stat = config.estimator.statistic(recent);

    if config.extmomentum > 0.0 {
        if let Some(old) = &state.old_stat {
            for i in 0..n {
                stat[i] = config.extmomentum * old[i] + (1.0 - config.extmomentum) * stat[i];
            }
        }
    }

    let bias = config.effective_signsbias();
    let mut all_stable = true;
    for i in 0..n {
        let decided = if stat[i] > bias {
            1.0
        } else if stat[i] < -bias {
            -1.0
        } else {
            signs[i]
        };

        if decided == signs[i] {
            state.counts[i] += 1;
        } else {
            state.counts[i] = 0;
            signs[i] = decided;
        }
        if state.counts[i] <= config.signcount_threshold {
            all_stable = false;
        }
    }

    if all_stable {
        state.pdfsize = clip_window(
            state.pdfsize.saturating_mul(config.signcount_step),
            total_samples,
        );
        state.counts.iter_mut().for_each(|c| *c = 0);
    }

    state.old_stat = Some(stat);
}
