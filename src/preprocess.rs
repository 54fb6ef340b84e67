// src/preprocess.rs

//! Data preprocessing: mean removal, PCA reduction, sphering.

use crate::error::{Result, RunicaError};
use crate::math::{covariance, sym_eig};
use faer::{Col, Mat, MatRef};

/// Subtract each channel's mean across samples, in place.
///
/// Returns the removed mean vector.
pub(crate) fn remove_mean(data: &mut Mat<f64>) -> Col<f64> {
    let (channels, samples) = (data.nrows(), data.ncols());
    let mut mean = Col::<f64>::zeros(channels);

    for i in 0..channels {
        let mut sum = 0.0;
        for j in 0..samples {
            sum += data[(i, j)];
        }
        mean[i] = sum / samples as f64;
    }

    for j in 0..samples {
        for i in 0..channels {
            data[(i, j)] -= mean[i];
        }
    }

    mean
}

/// Project mean-removed data onto the top `k` eigenvectors of its channel
/// covariance.
///
/// Returns the reduced data (`k` × samples) and the eigenvector basis
/// (channels × `k`, descending eigenvalue order).
pub(crate) fn reduce(data: MatRef<'_, f64>, k: usize) -> Result<(Mat<f64>, Mat<f64>)> {
    let channels = data.nrows();
    if k > channels {
        return Err(RunicaError::InvalidDimensions {
            message: format!(
                "pca target ({k}) cannot exceed the channel count ({channels})"
            ),
        });
    }

    let cov = covariance(data);
    let (_, vectors) = sym_eig(cov.as_ref())?;

    let basis = Mat::from_fn(channels, k, |i, j| vectors[(i, j)]);
    let reduced = basis.transpose() * data;

    Ok((reduced, basis))
}

/// Sphering matrix `2·C^(-1/2)` of mean-removed data.
///
/// Applying it leaves the data with covariance `4·I`. Fails when the
/// covariance is rank-deficient, judged relative to its largest
/// eigenvalue so small-amplitude recordings are not mistaken for
/// singular ones.
pub(crate) fn sphering_matrix(data: MatRef<'_, f64>) -> Result<Mat<f64>> {
    let n = data.nrows();
    let cov = covariance(data);
    let (values, vectors) = sym_eig(cov.as_ref())?;

    let tol = values[0].max(0.0) * 1e-12;
    if values.iter().any(|&v| v <= tol) {
        return Err(RunicaError::SingularMatrix);
    }

    // 2 · U · diag(λ^-1/2) · Uᵀ
    let mut sphere = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += vectors[(i, k)] * vectors[(j, k)] / values[k].sqrt();
            }
            sphere[(i, j)] = 2.0 * sum;
        }
    }

    Ok(sphere)
}
