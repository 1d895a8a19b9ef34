// Principal component analysis (PCA)

use crate::eigen::{eigenvalue_decomposition, Eigenpairs};
use crate::error::{PcaError, Result};
use crate::ipca::{incremental_pca, IncrementalPcaConfig};
use crate::linalg::{dot_inplace_right, symmetrize};
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Default tolerance for discarding negligible eigenvalues.
pub const DEFAULT_EPS: f64 = 1e-10;

/// Options for batch PCA.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Subtract the column means before decomposing. If `false`, the zero
    /// vector is subtracted and reported as the mean.
    pub centre: bool,
    /// Relative tolerance: eigenpairs with eigenvalue `<= max|eigenvalue| * eps`
    /// are discarded.
    pub eps: f64,
    /// Number of columns processed at a time by the in-place Gram-trick product.
    /// Must be greater than 0.
    pub inplace_block_size: usize,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            centre: true,
            eps: DEFAULT_EPS,
            inplace_block_size: 2048,
        }
    }
}

/// Result of a batch or incremental PCA: eigenvectors, eigenvalues and the
/// mean that was subtracted from the data.
///
/// This is a plain snapshot. Each call returns a new model; nothing is cached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PcaModel {
    /// Principal axes, one unit-norm eigenvector per row.
    /// Shape: (n_components, n_features)
    pub components: Array2<f64>,
    /// Eigenvalues of the covariance matrix, largest first.
    /// Shape: (n_components)
    pub eigenvalues: Array1<f64>,
    /// Mean subtracted from the data (zeros when centering was disabled).
    /// Shape: (n_features)
    pub mean: Array1<f64>,
}

impl PcaModel {
    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Merges a new batch of samples into this model.
    ///
    /// `n_samples` is the number of samples this model was built from. The
    /// model's mean is passed on as the prior mean, so a model fitted without
    /// centering (zero mean) is updated without centering as well.
    ///
    /// See [`incremental_pca`] for the algorithm and its errors.
    pub fn update(
        &self,
        new_data: ArrayView2<f64>,
        n_samples: usize,
        config: &IncrementalPcaConfig,
    ) -> Result<PcaModel> {
        incremental_pca(
            new_data,
            self.components.view(),
            self.eigenvalues.view(),
            n_samples,
            Some(self.mean.view()),
            config,
        )
    }
}

/// Applies PCA to a data matrix of shape (n_samples, n_features).
///
/// The data is centred into a fresh matrix; `data_matrix` is not modified.
/// When `n_features < n_samples` the (n_features x n_features) covariance
/// matrix is decomposed. Otherwise the (n_samples x n_samples) Gram matrix is
/// decomposed and its eigenvectors are mapped back to feature space, which
/// is much cheaper for wide data.
///
/// # Errors
/// Returns `InvalidShape` if the matrix has zero features or fewer than
/// 2 samples, and `SolverFailure` if the eigendecomposition fails.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use incremental_pca::{pca, PcaConfig};
///
/// let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 7.0]];
/// let model = pca(data.view(), &PcaConfig::default()).unwrap();
/// assert_eq!(model.n_features(), 2);
/// ```
pub fn pca(data_matrix: ArrayView2<f64>, config: &PcaConfig) -> Result<PcaModel> {
    let (n_samples, n_features) = data_matrix.dim();
    validate_data_shape(n_samples, n_features)?;

    let mean = column_mean(data_matrix, config.centre)?;
    let centered = &data_matrix - &mean;

    if n_features < n_samples {
        debug!("PCA on {}x{} data using the {}x{} covariance matrix.", n_samples, n_features, n_features, n_features);
        let (components, eigenvalues) = covariance_components(centered.view(), config.eps)?;
        return Ok(finish(components, eigenvalues, mean));
    }

    debug!("PCA on {}x{} data using the {}x{} Gram matrix.", n_samples, n_features, n_samples, n_samples);
    let pairs = gram_eigenpairs(centered.view(), config.eps)?;
    let mut components = pairs.eigenvectors.t().dot(&centered);
    scale_to_unit_rows(components.view_mut(), pairs.eigenvalues.view(), n_samples);
    Ok(finish(components, pairs.eigenvalues, mean))
}

/// Applies PCA to a data matrix, reusing its buffer.
///
/// Produces the same model as [`pca`], but the mean is subtracted from
/// `data_matrix` in place, so no centred copy is allocated. This matters when
/// the matrix is larger than half the available memory. In the Gram-matrix
/// regime the product that maps eigenvectors back to feature space is also
/// written into `data_matrix`: afterwards its first `n_components` rows hold
/// the returned components and the remaining rows hold centred data.
///
/// # Errors
/// Same as [`pca`], plus `InvalidShape` if `config.inplace_block_size` is 0.
pub fn pca_inplace(data_matrix: &mut Array2<f64>, config: &PcaConfig) -> Result<PcaModel> {
    let (n_samples, n_features) = data_matrix.dim();
    validate_data_shape(n_samples, n_features)?;
    if config.inplace_block_size == 0 {
        return Err(PcaError::InvalidShape("inplace_block_size must be greater than 0.".into()));
    }

    let mean = column_mean(data_matrix.view(), config.centre)?;
    *data_matrix -= &mean;

    if n_features < n_samples {
        debug!("In-place PCA on {}x{} data using the covariance matrix.", n_samples, n_features);
        let (components, eigenvalues) = covariance_components(data_matrix.view(), config.eps)?;
        return Ok(finish(components, eigenvalues, mean));
    }

    debug!("In-place PCA on {}x{} data using the Gram matrix.", n_samples, n_features);
    let pairs = gram_eigenpairs(data_matrix.view(), config.eps)?;
    let n_components = pairs.len();
    dot_inplace_right(pairs.eigenvectors.t(), data_matrix, config.inplace_block_size)?;
    let mut leading_rows = data_matrix.slice_mut(s![..n_components, ..]);
    scale_to_unit_rows(leading_rows.view_mut(), pairs.eigenvalues.view(), n_samples);
    let components = leading_rows.to_owned();
    Ok(finish(components, pairs.eigenvalues, mean))
}

fn validate_data_shape(n_samples: usize, n_features: usize) -> Result<()> {
    if n_samples == 0 || n_features == 0 {
        return Err(PcaError::InvalidShape(format!(
            "Input data matrix has zero samples or zero features ({}x{}).",
            n_samples, n_features
        )));
    }
    if n_samples < 2 {
        return Err(PcaError::InvalidShape("Input matrix must have at least 2 samples.".into()));
    }
    Ok(())
}

pub(crate) fn column_mean(data_matrix: ArrayView2<f64>, centre: bool) -> Result<Array1<f64>> {
    if !centre {
        return Ok(Array1::zeros(data_matrix.ncols()));
    }
    data_matrix
        .mean_axis(Axis(0))
        .ok_or_else(|| PcaError::InvalidShape("Failed to compute mean of an empty data matrix.".into()))
}

/// Eigenvectors of `X^T X / (n - 1)`, returned as rows.
fn covariance_components(centered: ArrayView2<f64>, eps: f64) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_samples = centered.nrows();
    let mut cov_matrix = centered.t().dot(&centered);
    cov_matrix /= (n_samples - 1) as f64;
    symmetrize(&mut cov_matrix);

    let pairs = eigenvalue_decomposition(&cov_matrix, eps)?;
    Ok((pairs.eigenvectors.reversed_axes(), pairs.eigenvalues))
}

/// Eigenpairs of `X X^T / (n - 1)`; eigenvectors are sample-space columns.
fn gram_eigenpairs(centered: ArrayView2<f64>, eps: f64) -> Result<Eigenpairs> {
    let n_samples = centered.nrows();
    let mut gram_matrix = centered.dot(&centered.t());
    gram_matrix /= (n_samples - 1) as f64;
    symmetrize(&mut gram_matrix);
    eigenvalue_decomposition(&gram_matrix, eps)
}

/// Scales row `i` of `V^T X` by `sqrt(1 / ((n - 1) * l_i))`, which makes it a
/// unit-norm eigenvector of the covariance matrix. Every `l_i` is positive
/// because the eigensolver has already filtered the rest.
fn scale_to_unit_rows(mut rows: ArrayViewMut2<f64>, eigenvalues: ArrayView1<f64>, n_samples: usize) {
    let dof = (n_samples - 1) as f64;
    Zip::from(rows.axis_iter_mut(Axis(0)))
        .and(eigenvalues)
        .for_each(|mut row, &l| {
            let w = (1.0 / (dof * l)).sqrt();
            row.mapv_inplace(|x| x * w);
        });
}

fn finish(components: Array2<f64>, eigenvalues: Array1<f64>, mean: Array1<f64>) -> PcaModel {
    if eigenvalues.is_empty() {
        warn!("PCA retained no eigenvalues above tolerance. Returning a zero-component model.");
    } else {
        debug!("PCA retained {} components.", eigenvalues.len());
    }
    PcaModel { components, eigenvalues, mean }
}
