//! Error types for the PCA routines.

use crate::linalg_backends::BackendError;
use thiserror::Error;

/// Errors raised by batch and incremental PCA.
///
/// A decomposition that leaves no eigenvalue above the tolerance is not an
/// error; it produces a model with zero components.
#[derive(Error, Debug)]
pub enum PcaError {
    /// Input dimensions are inconsistent or too small to decompose.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// The underlying eigendecomposition, QR or SVD failed.
    #[error("{stage} failed: {source}")]
    SolverFailure {
        stage: &'static str,
        #[source]
        source: BackendError,
    },
}

impl PcaError {
    pub(crate) fn solver(stage: &'static str) -> impl FnOnce(BackendError) -> PcaError {
        move |source| PcaError::SolverFailure { stage, source }
    }
}

/// Result type alias for PCA operations.
pub type Result<T> = std::result::Result<T, PcaError>;
