// src/math.rs

//! Shared numeric utilities: covariance, symmetric eigendecomposition,
//! dense inversion, and the small reductions the solver leans on.

use crate::error::{Result, RunicaError};
use faer::{Mat, MatRef, Side};

/// Channel covariance `X·Xᵀ / samples` of a channels × samples matrix.
pub(crate) fn covariance(data: MatRef<'_, f64>) -> Mat<f64> {
    let samples = data.ncols() as f64;
    let cov = data * data.transpose();
    Mat::from_fn(cov.nrows(), cov.ncols(), |i, j| cov[(i, j)] / samples)
}

/// Symmetric eigendecomposition with eigenvalues sorted descending.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvectors as columns, in
/// the same order as the eigenvalues.
pub(crate) fn sym_eig(m: MatRef<'_, f64>) -> Result<(Vec<f64>, Mat<f64>)> {
    let eig = m
        .self_adjoint_eigen(Side::Lower)
        .map_err(|_| RunicaError::LinearAlgebraFailure {
            message: "symmetric eigendecomposition did not converge".into(),
        })?;

    let s = eig.S();
    let u = eig.U();
    let n = m.nrows();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        s[b].partial_cmp(&s[a]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let values: Vec<f64> = order.iter().map(|&i| s[i]).collect();
    let vectors = Mat::from_fn(n, n, |row, col| u[(row, order[col])]);

    Ok((values, vectors))
}

/// Dense matrix inverse by Gauss-Jordan elimination with partial pivoting.
///
/// Adequate for the component-count-sized matrices this crate inverts;
/// fails with [`RunicaError::SingularMatrix`] when a pivot degenerates.
pub(crate) fn invert(m: MatRef<'_, f64>) -> Result<Mat<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(RunicaError::InvalidDimensions {
            message: format!("cannot invert a {}x{} matrix", m.nrows(), m.ncols()),
        });
    }

    let mut aug = Mat::<f64>::zeros(n, 2 * n);
    for i in 0..n {
        for j in 0..n {
            aug[(i, j)] = m[(i, j)];
        }
        aug[(i, n + i)] = 1.0;
    }

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if aug[(k, i)].abs() > aug[(max_row, i)].abs() {
                max_row = k;
            }
        }

        if max_row != i {
            for j in 0..(2 * n) {
                let tmp = aug[(i, j)];
                aug[(i, j)] = aug[(max_row, j)];
                aug[(max_row, j)] = tmp;
            }
        }

        if aug[(i, i)].abs() < 1e-15 {
            return Err(RunicaError::SingularMatrix);
        }

        let pivot = aug[(i, i)];
        for j in 0..(2 * n) {
            aug[(i, j)] /= pivot;
        }

        for k in 0..n {
            if k != i {
                let factor = aug[(k, i)];
                for j in 0..(2 * n) {
                    aug[(k, j)] -= factor * aug[(i, j)];
                }
            }
        }
    }

    Ok(Mat::from_fn(n, n, |i, j| aug[(i, n + j)]))
}

/// Largest absolute entry.
pub(crate) fn max_abs(m: MatRef<'_, f64>) -> f64 {
    let mut max = 0.0f64;
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            max = max.max(m[(i, j)].abs());
        }
    }
    max
}

/// Squared Frobenius norm.
pub(crate) fn frob_sq(m: MatRef<'_, f64>) -> f64 {
    let mut sum = 0.0;
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            sum += m[(i, j)] * m[(i, j)];
        }
    }
    sum
}

/// Entrywise dot product of two equally-shaped matrices.
pub(crate) fn dot_flat(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> f64 {
    debug_assert_eq!(a.nrows(), b.nrows());
    debug_assert_eq!(a.ncols(), b.ncols());
    let mut sum = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            sum += a[(i, j)] * b[(i, j)];
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn covariance_of_identity_rows() {
        let x = mat![[1.0, -1.0, 1.0, -1.0], [1.0, 1.0, -1.0, -1.0]];
        let c = covariance(x.as_ref());
        assert!((c[(0, 0)] - 1.0).abs() < 1e-12);
        assert!((c[(1, 1)] - 1.0).abs() < 1e-12);
        assert!(c[(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn sym_eig_sorts_descending() {
        let m = mat![[2.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 1.0]];
        let (values, vectors) = sym_eig(m.as_ref()).unwrap();
        assert!((values[0] - 5.0).abs() < 1e-10);
        assert!((values[1] - 2.0).abs() < 1e-10);
        assert!((values[2] - 1.0).abs() < 1e-10);

        // reconstruct: V diag(values) Vᵀ == m
        let n = 3;
        let mut recon = Mat::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += vectors[(i, k)] * values[k] * vectors[(j, k)];
                }
                recon[(i, j)] = sum;
            }
        }
        for i in 0..n {
            for j in 0..n {
                assert!((recon[(i, j)] - m[(i, j)]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn invert_round_trips() {
        let m = mat![[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(m.as_ref()).unwrap();
        let prod = &m * &inv;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn invert_rejects_singular() {
        let m = mat![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            invert(m.as_ref()),
            Err(RunicaError::SingularMatrix)
        ));
    }

    #[test]
    fn reductions_agree_with_hand_counts() {
        let m = mat![[1.0, -2.0], [3.0, -4.0]];
        assert_eq!(max_abs(m.as_ref()), 4.0);
        assert_eq!(frob_sq(m.as_ref()), 30.0);
        assert_eq!(dot_flat(m.as_ref(), m.as_ref()), 30.0);
    }
}
