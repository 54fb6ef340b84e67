//! Result types for a decomposition run.

use crate::math::invert;
use faer::{Col, Mat};

/// How the training loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Weight change fell below the stop threshold (or the learning rate
    /// annealed through its floor).
    Converged,
    /// The step cap was reached first; weights are the best estimate so
    /// far and still usable.
    MaxStepsReached,
}

/// Outputs of a decomposition run.
#[derive(Debug, Clone)]
pub struct RunicaResult {
    /// Unmixing weight matrix W (components × components), acting on
    /// sphered (and possibly PCA-reduced) data.
    pub weights: Mat<f64>,

    /// Sphering matrix (components × components); identity when sphering
    /// was disabled.
    pub sphere: Mat<f64>,

    /// PCA eigenvector basis (channels × components) when dimensionality
    /// reduction was enabled.
    pub pca: Option<Mat<f64>>,

    /// Per-channel mean removed from the input.
    pub mean: Col<f64>,

    /// Learned per-component bias, when the bias term was enabled.
    pub bias: Option<Col<f64>>,

    /// Final source-density signs (+1 super-Gaussian, −1 sub-Gaussian),
    /// extended mode only.
    pub signs: Option<Col<f64>>,

    /// Recovered source activations (components × samples), in descending
    /// variance order.
    pub activations: Mat<f64>,

    /// Map from output position to original component index, as produced
    /// by the variance reordering.
    pub order: Vec<usize>,

    /// How training stopped.
    pub status: ExitStatus,

    /// Training steps (passes over the data) performed.
    pub steps: usize,

    /// Weight-change magnitude at the final step.
    pub wchange: f64,

    /// Divergence restarts taken during the run.
    pub restarts: usize,

    /// Learning rate after the final step.
    pub lrate: f64,
}

impl RunicaResult {
    /// Whether the run met the stop threshold.
    pub fn converged(&self) -> bool {
        self.status == ExitStatus::Converged
    }

    /// The full unmixing transform from original channel space to
    /// component activations: `W·Sphere` (composed with the PCA basis
    /// when reduction was enabled).
    pub fn full_unmixing(&self) -> Mat<f64> {
        let ws = &self.weights * &self.sphere;
        match &self.pca {
            Some(basis) => &ws * basis.transpose(),
            None => ws,
        }
    }

    /// The mixing matrix mapping activations back to channel space: the
    /// inverse of the full unmixing (pseudo-inverse via the PCA basis when
    /// reduction was enabled). Falls back to the transpose when the square
    /// part is singular.
    pub fn mixing(&self) -> Mat<f64> {
        let ws = &self.weights * &self.sphere;
        let inv = match invert(ws.as_ref()) {
            Ok(inv) => inv,
            Err(_) => ws.transpose().to_owned(),
        };
        match &self.pca {
            Some(basis) => basis * &inv,
            None => inv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    fn stub_result(weights: Mat<f64>, sphere: Mat<f64>, pca: Option<Mat<f64>>) -> RunicaResult {
        let n = weights.nrows();
        RunicaResult {
            weights,
            sphere,
            pca,
            mean: Col::zeros(n),
            bias: None,
            signs: None,
            activations: Mat::zeros(n, 0),
            order: (0..n).collect(),
            status: ExitStatus::Converged,
            steps: 1,
            wchange: 0.0,
            restarts: 0,
            lrate: 1e-3,
        }
    }

    #[test]
    fn full_unmixing_composes_sphere() {
        let result = stub_result(
            mat![[2.0, 0.0], [0.0, 1.0]],
            mat![[1.0, 1.0], [0.0, 1.0]],
            None,
        );
        let full = result.full_unmixing();
        assert_eq!(full[(0, 0)], 2.0);
        assert_eq!(full[(0, 1)], 2.0);
        assert_eq!(full[(1, 0)], 0.0);
        assert_eq!(full[(1, 1)], 1.0);
    }

    #[test]
    fn mixing_inverts_full_unmixing() {
        let result = stub_result(
            mat![[2.0, 1.0], [0.5, 1.0]],
            mat![[1.5, 0.2], [0.1, 0.9]],
            None,
        );
        let prod = &result.full_unmixing() * &result.mixing();
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn pca_basis_extends_unmixing_to_channel_space() {
        // 3 channels reduced to 2 components
        let basis = mat![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let result = stub_result(
            Mat::identity(2, 2),
            Mat::identity(2, 2),
            Some(basis),
        );
        let full = result.full_unmixing();
        assert_eq!(full.nrows(), 2);
        assert_eq!(full.ncols(), 3);

        let mixing = result.mixing();
        assert_eq!(mixing.nrows(), 3);
        assert_eq!(mixing.ncols(), 2);
    }
}
