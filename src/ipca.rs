// src/ipca.rs

//! Incremental PCA: merging a new batch of samples into an existing
//! eigenbasis without revisiting the samples that produced it.
//!
//! The update follows Ross, Lim, Lin and Yang, "Incremental Learning for
//! Robust Visual Tracking" (IJCV, 2007). The prior eigenvalues are turned
//! back into singular values, the new samples are split into the part inside
//! the current basis and an orthonormal basis for the rest, and a small
//! `(p_a + rows) x (p_a + k)` matrix is decomposed with an SVD to rotate the
//! stacked basis into the merged principal axes.

use crate::error::{PcaError, Result};
use crate::linalg_backends::{BackendQR, BackendSVD, LinAlgBackendProvider};
use crate::pca::{column_mean, PcaModel, DEFAULT_EPS};
use log::{debug, trace, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Options for an incremental update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncrementalPcaConfig {
    /// Weight in `[0, 1]` applied to the previously seen samples. `1.0` gives
    /// the same result as batch PCA on the concatenated data; smaller values
    /// put more emphasis on the new samples.
    pub forgetting_factor: f64,
    /// Absolute tolerance: merged eigenvalues `<= eps` are discarded.
    pub eps: f64,
}

impl Default for IncrementalPcaConfig {
    fn default() -> Self {
        IncrementalPcaConfig {
            forgetting_factor: 1.0,
            eps: DEFAULT_EPS,
        }
    }
}

/// Updates the eigenvectors `components`, eigenvalues `eigenvalues` and mean
/// `mean` of a PCA model with the samples in `new_data`.
///
/// * `new_data` - New samples, shape (n_new, n_features).
/// * `components` - Current eigenvectors as rows, shape (n_components, n_features).
/// * `eigenvalues` - Current eigenvalues, shape (n_components).
/// * `n_samples` - Number of samples used to produce the current model.
/// * `mean` - Current mean. If `None` or all zeros, the update is uncentred
///   and the returned mean is zero.
///
/// Eigenvalues of the merged model that do not exceed `config.eps` are
/// dropped together with their eigenvectors. Unlike batch PCA this is an
/// absolute threshold.
///
/// # Errors
/// Returns `InvalidShape` if the feature dimensions disagree, `new_data` is
/// empty, `n_samples < 2`, the eigenvalues are negative or non-finite, the
/// forgetting factor is outside `[0, 1]`, or the weighted total sample count
/// is not above 1. Returns `SolverFailure` if the QR or SVD fails.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use incremental_pca::{incremental_pca, pca, IncrementalPcaConfig, PcaConfig};
///
/// let first = array![[1.0, 2.0], [3.0, 4.5], [5.0, 7.0]];
/// let second = array![[2.0, 2.5], [4.0, 6.5]];
/// let model = pca(first.view(), &PcaConfig::default()).unwrap();
/// let updated = incremental_pca(
///     second.view(),
///     model.components.view(),
///     model.eigenvalues.view(),
///     first.nrows(),
///     Some(model.mean.view()),
///     &IncrementalPcaConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(updated.n_features(), 2);
/// ```
pub fn incremental_pca(
    new_data: ArrayView2<f64>,
    components: ArrayView2<f64>,
    eigenvalues: ArrayView1<f64>,
    n_samples: usize,
    mean: Option<ArrayView1<f64>>,
    config: &IncrementalPcaConfig,
) -> Result<PcaModel> {
    let (n_new, n_features) = new_data.dim();
    let n_prior_components = components.nrows();
    validate_inputs(new_data, components, eigenvalues, n_samples, mean, config)?;

    let f = config.forgetting_factor;
    let n_prior = n_samples as f64;
    // Singular values of the centred prior data.
    let prior_singular_values = eigenvalues.mapv(|l| ((n_prior - 1.0) * l).sqrt());

    let n_prior_weighted = n_prior * f;
    let n_total = n_prior_weighted + n_new as f64;
    if n_total <= 1.0 {
        return Err(PcaError::InvalidShape(format!(
            "Weighted sample count {} must exceed 1 (prior {} x forgetting factor {} + {} new samples).",
            n_total, n_samples, f, n_new
        )));
    }
    debug!(
        "Incremental PCA: {} prior components from {} samples (weighted {}), {} new samples, {} features.",
        n_prior_components, n_samples, n_prior_weighted, n_new, n_features
    );

    let centred_prior = mean.filter(|m| m.iter().any(|&v| v != 0.0));
    let (work, merged_mean) = match centred_prior {
        Some(prior_mean) => {
            let new_mean = column_mean(new_data, true)?;
            let merged_mean = (n_prior_weighted / n_total) * &prior_mean + (n_new as f64 / n_total) * &new_mean;

            // One extra row carries the shift between the two means.
            let mut work = Array2::<f64>::zeros((n_new + 1, n_features));
            work.slice_mut(s![..n_new, ..]).assign(&(&new_data - &new_mean));
            let shift_weight = (n_prior_weighted * n_new as f64 / n_total).sqrt();
            work.row_mut(n_new).assign(&((&new_mean - &prior_mean) * shift_weight));
            (work, merged_mean)
        }
        None => (new_data.to_owned(), Array1::zeros(n_features)),
    };

    // Coordinates of the new rows in the current basis, and the residual orthogonal to it.
    let in_basis = work.dot(&components.t());
    let residual = &work - &in_basis.dot(&components);

    let backend = LinAlgBackendProvider::<f64>::new();
    let residual_basis = backend
        .qr_q_factor(&residual.t().to_owned())
        .map_err(PcaError::solver("QR of projected residual"))?
        .reversed_axes();
    let n_new_directions = residual_basis.nrows();
    trace!("Residual basis has {} directions.", n_new_directions);

    let mut merge_matrix = Array2::<f64>::zeros((
        n_prior_components + work.nrows(),
        n_prior_components + n_new_directions,
    ));
    merge_matrix
        .slice_mut(s![..n_prior_components, ..n_prior_components])
        .diag_mut()
        .assign(&(&prior_singular_values * f));
    merge_matrix
        .slice_mut(s![n_prior_components.., ..n_prior_components])
        .assign(&in_basis);
    merge_matrix
        .slice_mut(s![n_prior_components.., n_prior_components..])
        .assign(&residual.dot(&residual_basis.t()));

    let svd = backend
        .svd_vt(merge_matrix)
        .map_err(PcaError::solver("SVD of merge matrix"))?;

    let merged_eigenvalues = svd.s.mapv(|s| s * s / (n_total - 1.0));
    // Singular values are sorted, so the kept eigenvalues form a prefix.
    let n_kept = merged_eigenvalues.iter().take_while(|&&l| l > config.eps).count();

    let stacked_basis = ndarray::concatenate(Axis(0), &[components.view(), residual_basis.view()])
        .map_err(|e| PcaError::InvalidShape(format!("Failed to stack bases: {}", e)))?;
    let merged_components = svd.vt.slice(s![..n_kept, ..]).dot(&stacked_basis);

    if n_kept == 0 {
        warn!("Incremental PCA retained no eigenvalues above {:e}. Returning a zero-component model.", config.eps);
    } else {
        debug!("Incremental PCA retained {} components.", n_kept);
    }

    Ok(PcaModel {
        components: merged_components,
        eigenvalues: merged_eigenvalues.slice(s![..n_kept]).to_owned(),
        mean: merged_mean,
    })
}

fn validate_inputs(
    new_data: ArrayView2<f64>,
    components: ArrayView2<f64>,
    eigenvalues: ArrayView1<f64>,
    n_samples: usize,
    mean: Option<ArrayView1<f64>>,
    config: &IncrementalPcaConfig,
) -> Result<()> {
    let (n_new, n_features) = new_data.dim();
    if n_new == 0 || n_features == 0 {
        return Err(PcaError::InvalidShape(format!(
            "New data matrix has zero samples or zero features ({}x{}).",
            n_new, n_features
        )));
    }
    if components.ncols() != n_features {
        return Err(PcaError::InvalidShape(format!(
            "New data has {} features but the eigenvectors have {}.",
            n_features,
            components.ncols()
        )));
    }
    if eigenvalues.len() != components.nrows() {
        return Err(PcaError::InvalidShape(format!(
            "Got {} eigenvalues for {} eigenvectors.",
            eigenvalues.len(),
            components.nrows()
        )));
    }
    if eigenvalues.iter().any(|&l| !l.is_finite() || l < 0.0) {
        return Err(PcaError::InvalidShape("Eigenvalues must be finite and non-negative.".into()));
    }
    if let Some(m) = mean {
        if m.len() != n_features {
            return Err(PcaError::InvalidShape(format!(
                "Mean has {} entries but the data has {} features.",
                m.len(),
                n_features
            )));
        }
    }
    if n_samples < 2 {
        return Err(PcaError::InvalidShape(format!(
            "The prior model must come from at least 2 samples, got {}.",
            n_samples
        )));
    }
    let f = config.forgetting_factor;
    if !f.is_finite() || !(0.0..=1.0).contains(&f) {
        return Err(PcaError::InvalidShape(format!(
            "Forgetting factor must lie in [0, 1], got {}.",
            f
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn prior() -> PcaModel {
        PcaModel {
            components: array![[1.0, 0.0, 0.0]],
            eigenvalues: array![2.0],
            mean: array![0.5, 0.5, 0.5],
        }
    }

    #[test]
    fn rejects_mismatched_feature_counts() {
        let p = prior();
        let data = Array2::<f64>::ones((3, 4));
        let err = p.update(data.view(), 10, &IncrementalPcaConfig::default()).unwrap_err();
        assert!(matches!(err, PcaError::InvalidShape(_)));
    }

    #[test]
    fn rejects_eigenvalue_count_mismatch() {
        let data = Array2::<f64>::ones((3, 3));
        let res = incremental_pca(
            data.view(),
            array![[1.0, 0.0, 0.0]].view(),
            array![1.0, 2.0].view(),
            10,
            None,
            &IncrementalPcaConfig::default(),
        );
        assert!(matches!(res, Err(PcaError::InvalidShape(_))));
    }

    #[test]
    fn rejects_small_prior_and_bad_forgetting_factor() {
        let p = prior();
        let data = Array2::<f64>::ones((3, 3));
        assert!(p.update(data.view(), 1, &IncrementalPcaConfig::default()).is_err());
        for f in [-0.1, 1.5, f64::NAN] {
            let config = IncrementalPcaConfig { forgetting_factor: f, ..Default::default() };
            assert!(matches!(p.update(data.view(), 10, &config), Err(PcaError::InvalidShape(_))));
        }
    }

    #[test]
    fn rejects_single_weighted_sample() {
        let p = prior();
        let data = array![[1.0, 2.0, 3.0]];
        let config = IncrementalPcaConfig { forgetting_factor: 0.0, ..Default::default() };
        assert!(matches!(p.update(data.view(), 10, &config), Err(PcaError::InvalidShape(_))));
    }

    #[test]
    fn zero_mean_prior_runs_uncentred() {
        let p = PcaModel {
            components: array![[1.0, 0.0]],
            eigenvalues: array![1.0],
            mean: array![0.0, 0.0],
        };
        // Two prior samples with singular value 1 along x; the new sample adds y.
        let data = array![[0.0, 3.0]];
        let updated = p.update(data.view(), 2, &IncrementalPcaConfig::default()).unwrap();
        assert_eq!(updated.mean, array![0.0, 0.0]);
        // Uncentred scatter over 3 samples: diag(1, 9) / 2.
        assert_abs_diff_eq!(updated.eigenvalues, array![4.5, 0.5], epsilon = 1e-12);
        assert_abs_diff_eq!(updated.components.row(0).mapv(f64::abs), array![0.0, 1.0], epsilon = 1e-12);
        assert_abs_diff_eq!(updated.components.row(1).mapv(f64::abs), array![1.0, 0.0], epsilon = 1e-12);
    }

    #[test]
    fn zero_component_prior_is_accepted() {
        let data = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 2.0], [0.0, -2.0]];
        let updated = incremental_pca(
            data.view(),
            Array2::<f64>::zeros((0, 2)).view(),
            Array1::<f64>::zeros(0).view(),
            5,
            None,
            &IncrementalPcaConfig::default(),
        )
        .unwrap();
        // Uncentred scatter of the new rows divided by (5 + 4 - 1).
        assert_abs_diff_eq!(updated.eigenvalues, array![1.0, 0.25], epsilon = 1e-12);
        assert_eq!(updated.components.dim(), (2, 2));
    }

    #[test]
    fn merged_basis_stacks_prior_and_residual_directions() {
        let prior_components = array![[1.0, 0.0, 0.0]];
        let prior_eigenvalues = array![1.0];
        let data = array![[0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];

        let updated = incremental_pca(
            data.view(),
            prior_components.view(),
            prior_eigenvalues.view(),
            2,
            None,
            &IncrementalPcaConfig::default(),
        )
        .unwrap();
        // The prior is still usable after the update.
        assert_eq!(prior_components.nrows(), 1);

        // Uncentred scatter diag(1, 9, 4) over 4 samples.
        assert_abs_diff_eq!(updated.eigenvalues, array![3.0, 4.0 / 3.0, 1.0 / 3.0], epsilon = 1e-12);
        let abs_components = updated.components.mapv(f64::abs);
        assert_abs_diff_eq!(
            abs_components,
            array![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
            epsilon = 1e-12
        );
    }
}
