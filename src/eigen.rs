// src/eigen.rs

//! Filtered eigendecomposition of symmetric covariance and scatter matrices.

use crate::error::{PcaError, Result};
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};
use log::{debug, trace};
use ndarray::{Array1, Array2, Axis};

/// Positive, non-negligible eigenpairs of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct Eigenpairs {
    /// Unit-norm eigenvectors stored as columns, shape `(n, p)`.
    pub eigenvectors: Array2<f64>,
    /// Eigenvalues sorted in descending order, shape `(p,)`.
    pub eigenvalues: Array1<f64>,
}

impl Eigenpairs {
    /// Number of retained eigenpairs.
    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }
}

/// Eigendecomposition of a symmetric matrix, keeping only the eigenpairs
/// whose eigenvalue is strictly positive and greater than
/// `max(|eigenvalues|) * eps`.
///
/// Only the upper triangle of `matrix` is read. The returned eigenvalues are
/// sorted from largest to smallest and the eigenvector columns follow the
/// same order. If no eigenvalue survives, both outputs are empty (the
/// eigenvector matrix has shape `(n, 0)`).
///
/// # Errors
/// Returns `InvalidShape` for a non-square matrix and `SolverFailure` if the
/// backend eigensolver does not converge.
pub fn eigenvalue_decomposition(matrix: &Array2<f64>, eps: f64) -> Result<Eigenpairs> {
    let (nrows, ncols) = matrix.dim();
    if nrows != ncols {
        return Err(PcaError::InvalidShape(format!(
            "Eigendecomposition needs a square matrix, got {}x{}.",
            nrows, ncols
        )));
    }

    let backend = LinAlgBackendProvider::<f64>::new();
    let eig = backend
        .eigh_upper(matrix)
        .map_err(PcaError::solver("Symmetric eigendecomposition"))?;

    let values = &eig.eigenvalues;
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));

    let limit = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) * eps;
    trace!("Eigenvalue limit for a {}x{} matrix: {:e}", nrows, ncols, limit);

    let kept: Vec<usize> = order
        .into_iter()
        .filter(|&i| values[i] > 0.0)
        .filter(|&i| values[i] > limit)
        .collect();

    debug!(
        "Kept {} of {} eigenpairs above tolerance {:e}.",
        kept.len(),
        values.len(),
        eps
    );

    Ok(Eigenpairs {
        eigenvectors: eig.eigenvectors.select(Axis(1), &kept),
        eigenvalues: values.select(Axis(0), &kept),
    })
}
