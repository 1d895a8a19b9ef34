// Batch and incremental principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod eigen;
pub mod error;
pub mod ipca;
pub mod linalg;
pub mod linalg_backends;
pub mod pca;


pub use eigen::{eigenvalue_decomposition, Eigenpairs};
pub use error::{PcaError, Result};
pub use ipca::{incremental_pca, IncrementalPcaConfig};
pub use linalg::dot_inplace_right;
pub use pca::{pca, pca_inplace, PcaConfig, PcaModel, DEFAULT_EPS};
