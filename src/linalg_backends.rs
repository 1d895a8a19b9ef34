// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;
use std::marker::PhantomData;

/// Error type returned by every backend decomposition.
pub type BackendError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

// --- Trait Definitions ---

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput<F: 'static> {
    /// Eigenvalues in the backend's native order (ascending for LAPACK and faer).
    pub eigenvalues: Array1<F>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<F>,
}

/// Symmetric eigendecomposition reading only the upper triangle.
pub trait BackendEigh<F: 'static + Copy + Send + Sync> {
    fn eigh_upper(&self, matrix: &Array2<F>) -> Result<EighOutput<F>, BackendError>;
}

/// Thin QR decomposition, returning only the Q factor.
///
/// For an `m x n` input the returned Q is `m x min(m, n)` with orthonormal columns.
pub trait BackendQR<F: 'static + Copy + Send + Sync> {
    fn qr_q_factor(&self, matrix: &Array2<F>) -> Result<Array2<F>, BackendError>;
}

/// Singular values and right singular vectors of a matrix.
///
/// Singular values are sorted in descending order. `vt` holds at least
/// `s.len()` rows; callers must not rely on any rows beyond that.
#[derive(Debug)]
pub struct SVDOutput<F: 'static> {
    pub s: Array1<F>,
    pub vt: Array2<F>,
}

/// Singular Value Decomposition without the left singular vectors.
pub trait BackendSVD<F: 'static + Copy + Send + Sync> {
    fn svd_vt(&self, matrix: Array2<F>) -> Result<SVDOutput<F>, BackendError>;
}

// --- ndarray-linalg (LAPACK) backend ---
use ndarray_linalg::{Eigh as NdLinalgEigh, QR as NdLinalgQR, SVDInto as NdLinalgSVDInto, UPLO};

#[cfg_attr(feature = "backend_faer", allow(dead_code))]
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

#[cfg_attr(feature = "backend_faer", allow(dead_code))]
fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> BackendError {
    Box::new(e)
}

impl BackendEigh<f64> for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
        if matrix.is_empty() {
            return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((matrix.nrows(), 0)) });
        }
        let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(to_dyn_error)?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

impl BackendQR<f64> for NdarrayLinAlgBackend {
    fn qr_q_factor(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, BackendError> {
        let (nrows, ncols) = matrix.dim();
        if nrows == 0 || ncols == 0 {
            return Ok(Array2::zeros((nrows, nrows.min(ncols))));
        }
        let (q_factor, _r) = matrix.qr().map_err(to_dyn_error)?;
        Ok(q_factor)
    }
}

impl BackendSVD<f64> for NdarrayLinAlgBackend {
    fn svd_vt(&self, matrix: Array2<f64>) -> Result<SVDOutput<f64>, BackendError> {
        let (nrows, ncols) = matrix.dim();
        if nrows == 0 || ncols == 0 {
            return Ok(SVDOutput { s: Array1::zeros(0), vt: Array2::zeros((0, ncols)) });
        }
        let (_u, s, vt) = matrix.svd_into(false, true).map_err(to_dyn_error)?;
        let vt = vt.ok_or_else(|| BackendError::from("LAPACK SVD did not return right singular vectors"))?;
        Ok(SVDOutput { s, vt })
    }
}

// --- faer backend ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendEigh, BackendError, BackendQR, BackendSVD, EighOutput, SVDOutput};
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use faer::{ColRef, MatRef};
    use ndarray::{Array1, Array2};

    fn to_dyn_error_faer(msg: String) -> BackendError {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((faer_mat.nrows(), faer_mat.ncols()), |(i, j)| faer_mat[(i, j)])
    }

    fn faer_col_to_ndarray_vec(faer_col: ColRef<'_, f64>) -> Array1<f64> {
        Array1::from_shape_fn(faer_col.nrows(), |i| faer_col[i])
    }

    /// Borrows a contiguous ndarray matrix as a faer view without copying.
    fn as_faer_view(matrix: &Array2<f64>) -> Result<MatRef<'_, f64>, BackendError> {
        let (nrows, ncols) = matrix.dim();
        let slice = matrix.as_slice_memory_order().ok_or_else(|| {
            to_dyn_error_faer(format!(
                "Input ndarray matrix ({}x{}) is non-contiguous and cannot be directly viewed by faer.",
                nrows, ncols
            ))
        })?;
        if matrix.is_standard_layout() {
            Ok(MatRef::from_row_major_slice(slice, nrows, ncols))
        } else {
            Ok(MatRef::from_column_major_slice(slice, nrows, ncols))
        }
    }

    impl BackendEigh<f64> for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
            if matrix.nrows() != matrix.ncols() {
                return Err(to_dyn_error_faer("Matrix must be square for eigendecomposition.".to_string()));
            }
            if matrix.is_empty() {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            let eig = as_faer_view(matrix)?
                .self_adjoint_eigen(faer::Side::Upper)
                .map_err(|e| to_dyn_error_faer(format!("Faer eigendecomposition failed: {:?}", e)))?;
            Ok(EighOutput {
                eigenvalues: faer_col_to_ndarray_vec(eig.S().column_vector()),
                eigenvectors: faer_mat_to_ndarray(eig.U()),
            })
        }
    }

    impl BackendQR<f64> for FaerLinAlgBackend {
        fn qr_q_factor(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, BackendError> {
            let (nrows, ncols) = matrix.dim();
            if nrows == 0 || ncols == 0 {
                return Ok(Array2::zeros((nrows, nrows.min(ncols))));
            }
            let q_thin = as_faer_view(matrix)?.qr().compute_thin_Q();
            Ok(faer_mat_to_ndarray(q_thin.as_ref()))
        }
    }

    impl BackendSVD<f64> for FaerLinAlgBackend {
        fn svd_vt(&self, matrix: Array2<f64>) -> Result<SVDOutput<f64>, BackendError> {
            let (nrows, ncols) = matrix.dim();
            if nrows == 0 || ncols == 0 {
                return Ok(SVDOutput { s: Array1::zeros(0), vt: Array2::zeros((0, ncols)) });
            }
            let svd = FaerSolverSvd::new_thin(as_faer_view(&matrix)?)
                .map_err(|e| to_dyn_error_faer(format!("Faer SVD computation failed: {:?}", e)))?;

            let s = faer_col_to_ndarray_vec(svd.S().column_vector());
            let vt = faer_mat_to_ndarray(svd.V()).reversed_axes();
            Ok(SVDOutput { s, vt })
        }
    }
}

// --- Provider dispatch ---
// Exactly one backend is active per build; the other is never reached.

impl BackendEigh<f64> for LinAlgBackendProvider<f64> {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput<f64>, BackendError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}

impl BackendQR<f64> for LinAlgBackendProvider<f64> {
    fn qr_q_factor(&self, matrix: &Array2<f64>) -> Result<Array2<f64>, BackendError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.qr_q_factor(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.qr_q_factor(matrix)
        }
    }
}

impl BackendSVD<f64> for LinAlgBackendProvider<f64> {
    fn svd_vt(&self, matrix: Array2<f64>) -> Result<SVDOutput<f64>, BackendError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.svd_vt(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.svd_vt(matrix)
        }
    }
}
