// src/postprocess.rs

//! Postprocessing of converged components: polarity normalization and
//! variance-descending reordering.

use crate::error::Result;
use crate::math::invert;
use faer::{Col, Mat, MatRef};

/// Flip each component whose dominant-magnitude activation sample is
/// negative, so every component satisfies the positive-activation
/// convention. Flips the weight row, the bias entry, and the activation
/// row together; this fixes an arbitrary convention only, not true source
/// polarity.
pub(crate) fn normalize_polarity(
    weights: &mut Mat<f64>,
    bias: &mut Col<f64>,
    acts: &mut Mat<f64>,
) {
    let (ncomps, samples) = (acts.nrows(), acts.ncols());

    for i in 0..ncomps {
        let mut peak = 0.0f64;
        let mut peak_val = 0.0f64;
        for j in 0..samples {
            let v = acts[(i, j)];
            if v.abs() > peak {
                peak = v.abs();
                peak_val = v;
            }
        }

        if peak_val < 0.0 {
            for j in 0..samples {
                acts[(i, j)] = -acts[(i, j)];
            }
            for j in 0..weights.ncols() {
                weights[(i, j)] = -weights[(i, j)];
            }
            bias[i] = -bias[i];
        }
    }
}

/// Reorder components by descending variance contribution to the
/// reconstructed data.
///
/// The contribution of component `i` is the power of its back-projection:
/// the squared norm of column `i` of `(W·Sphere)⁻¹` times the mean power
/// of activation row `i`. Rows of the weight matrix, bias, signs, and
/// activations are permuted together; the returned map gives, for each
/// output position, the original component index (a bijection).
pub(crate) fn reorder_by_variance(
    weights: &mut Mat<f64>,
    sphere: MatRef<'_, f64>,
    bias: &mut Col<f64>,
    signs: Option<&mut Col<f64>>,
    acts: &mut Mat<f64>,
) -> Result<Vec<usize>> {
    let ncomps = weights.nrows();
    let samples = acts.ncols();

    let unmixing = &*weights * sphere;
    let mixing = invert(unmixing.as_ref())?;

    let mut variances = vec![0.0f64; ncomps];
    for i in 0..ncomps {
        let mut col_power = 0.0;
        for c in 0..ncomps {
            col_power += mixing[(c, i)] * mixing[(c, i)];
        }
        let mut act_power = 0.0;
        for j in 0..samples {
            act_power += acts[(i, j)] * acts[(i, j)];
        }
        variances[i] = col_power * act_power / samples as f64;
    }

    let mut order: Vec<usize> = (0..ncomps).collect();
    order.sort_by(|&a, &b| {
        variances[b]
            .partial_cmp(&variances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let old_weights = weights.clone();
    let old_bias = bias.clone();
    let old_acts = acts.clone();
    for (new_i, &old_i) in order.iter().enumerate() {
        for j in 0..weights.ncols() {
            weights[(new_i, j)] = old_weights[(old_i, j)];
        }
        bias[new_i] = old_bias[old_i];
        for j in 0..samples {
            acts[(new_i, j)] = old_acts[(old_i, j)];
        }
    }
    if let Some(signs) = signs {
        let old_signs = signs.clone();
        for (new_i, &old_i) in order.iter().enumerate() {
            signs[new_i] = old_signs[old_i];
        }
    }

    Ok(order)
}
