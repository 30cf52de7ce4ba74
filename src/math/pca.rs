//! PCA basis: mean, eigenvectors, and their pseudo-inverse.
//!
//! `project` / `back_project` are the two primitives every parametric model
//! is built on:
//!
//! ```text
//! project(x)      = B⁺ (x - μ)      (D -> K)
//! back_project(p) = μ + B p         (K -> D)
//! ```
//!
//! `train_pca` builds a basis from a data matrix (one sample per row) with a
//! thin SVD of the centred data.

use log::warn;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Tolerances tried in order when computing the pseudo-inverse.
const PINV_TOLERANCES: [f64; 3] = [1e-12, 1e-10, 1e-8];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaBasis {
    mean: DVector<f64>,
    /// D x K, one principal direction per column.
    eigen_basis: DMatrix<f64>,
    /// K x D.
    eigen_basis_inverse: DMatrix<f64>,
    /// Singular values of the retained components (empty when unknown).
    singular_values: DVector<f64>,
}

impl PcaBasis {
    /// Build a basis from a mean and a D x K eigenvector matrix.
    pub fn new(mean: DVector<f64>, eigen_basis: DMatrix<f64>) -> Result<Self, FitError> {
        if eigen_basis.nrows() != mean.len() {
            return Err(FitError::ModelConstructionFailed(format!(
                "eigen basis has {} rows but the mean has length {}",
                eigen_basis.nrows(),
                mean.len()
            )));
        }
        if eigen_basis.ncols() == 0 {
            return Err(FitError::ModelConstructionFailed(
                "eigen basis has no components".to_string(),
            ));
        }
        if eigen_basis.iter().chain(mean.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::ModelConstructionFailed(
                "PCA basis contains non-finite values".to_string(),
            ));
        }

        let eigen_basis_inverse = pseudo_inverse(&eigen_basis)?;
        Ok(Self {
            mean,
            eigen_basis,
            eigen_basis_inverse,
            singular_values: DVector::zeros(0),
        })
    }

    pub fn with_singular_values(mut self, singular_values: DVector<f64>) -> Result<Self, FitError> {
        if singular_values.len() != self.dimension() {
            return Err(FitError::dimension(
                "singular values",
                self.dimension(),
                singular_values.len(),
            ));
        }
        self.singular_values = singular_values;
        Ok(self)
    }

    /// Number of retained components (K).
    pub fn dimension(&self) -> usize {
        self.eigen_basis.ncols()
    }

    /// Length of the raw feature vector (D).
    pub fn feature_len(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn eigen_basis(&self) -> &DMatrix<f64> {
        &self.eigen_basis
    }

    pub fn eigen_basis_inverse(&self) -> &DMatrix<f64> {
        &self.eigen_basis_inverse
    }

    pub fn singular_values(&self) -> &DVector<f64> {
        &self.singular_values
    }

    /// Fraction of the retained variance carried by each component.
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        let total: f64 = self.singular_values.iter().map(|s| s * s).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        self.singular_values.iter().map(|s| s * s / total).collect()
    }

    pub fn project(&self, features: &DVector<f64>) -> Result<DVector<f64>, FitError> {
        if features.len() != self.feature_len() {
            return Err(FitError::dimension("encode", self.feature_len(), features.len()));
        }
        Ok(&self.eigen_basis_inverse * (features - &self.mean))
    }

    pub fn back_project(&self, params: &DVector<f64>) -> Result<DVector<f64>, FitError> {
        if params.len() != self.dimension() {
            return Err(FitError::dimension("decode", self.dimension(), params.len()));
        }
        Ok(&self.mean + &self.eigen_basis * params)
    }
}

/// Train a PCA basis from `data` (one sample per row).
///
/// Components are kept in descending singular-value order; at most
/// `max_components` are retained, and any component whose singular value is
/// at or below `tolerance` times the largest one is dropped.
pub fn train_pca(
    data: &DMatrix<f64>,
    max_components: usize,
    tolerance: f64,
) -> Result<PcaBasis, FitError> {
    let (n, d) = data.shape();
    if n == 0 || d == 0 {
        return Err(FitError::ModelConstructionFailed(format!(
            "cannot train PCA on a {n}x{d} data matrix"
        )));
    }
    if max_components == 0 {
        return Err(FitError::ModelConstructionFailed(
            "max_components must be >= 1".to_string(),
        ));
    }

    let mean = DVector::from_fn(d, |j, _| data.column(j).mean());
    let centred_t = DMatrix::from_fn(d, n, |j, i| data[(i, j)] - mean[j]);

    let svd = centred_t.svd(true, false);
    let Some(u) = svd.u else {
        return Err(FitError::ModelConstructionFailed(
            "SVD did not produce left singular vectors".to_string(),
        ));
    };
    let sv = svd.singular_values;

    // Descending order, stable on ties so the result does not depend on the
    // decomposition's internal ordering.
    let mut order: Vec<usize> = (0..sv.len()).collect();
    order.sort_by(|&a, &b| sv[b].total_cmp(&sv[a]));

    let s_max = order.first().map(|&i| sv[i]).unwrap_or(0.0);
    let cutoff = tolerance.max(0.0) * s_max;
    let kept: Vec<usize> = order
        .iter()
        .copied()
        .filter(|&i| sv[i] > cutoff && sv[i] > 0.0)
        .take(max_components)
        .collect();

    let dropped = order.len().min(max_components).saturating_sub(kept.len());
    if dropped > 0 {
        warn!("PCA: dropped {dropped} near-zero component(s) of {d}-dim data");
    }
    if kept.is_empty() {
        return Err(FitError::ModelConstructionFailed(
            "training data has no variance (all components are zero)".to_string(),
        ));
    }

    let basis = DMatrix::from_fn(d, kept.len(), |r, c| u[(r, kept[c])]);
    let values = DVector::from_iterator(kept.len(), kept.iter().map(|&i| sv[i]));
    PcaBasis::new(mean, basis)?.with_singular_values(values)
}

fn pseudo_inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, FitError> {
    let mut last_err = "no tolerance accepted";
    for &tol in &PINV_TOLERANCES {
        match m.clone().pseudo_inverse(tol) {
            Ok(inv) if inv.iter().all(|v| v.is_finite()) => return Ok(inv),
            Ok(_) => last_err = "pseudo-inverse is not finite",
            Err(e) => last_err = e,
        }
    }
    Err(FitError::ModelConstructionFailed(format!(
        "eigen basis pseudo-inverse failed: {last_err}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn training_data() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            4,
            &[
                1.0, 2.0, 0.5, 3.0, //
                2.0, 1.0, 1.5, 2.0, //
                0.0, 3.0, 2.5, 1.0, //
                3.0, 0.5, 0.0, 4.0, //
                1.5, 1.5, 1.0, 0.0,
            ],
        )
    }

    #[test]
    fn full_rank_pca_reconstructs_training_rows() {
        let data = training_data();
        let pca = train_pca(&data, 10, 1e-12).unwrap();
        assert_eq!(pca.dimension(), 4);

        for i in 0..data.nrows() {
            let x = data.row(i).transpose();
            let p = pca.project(&x).unwrap();
            let back = pca.back_project(&p).unwrap();
            for j in 0..x.len() {
                assert_abs_diff_eq!(back[j], x[j], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn truncated_pca_keeps_largest_components_first() {
        let pca = train_pca(&training_data(), 2, 1e-12).unwrap();
        assert_eq!(pca.dimension(), 2);
        let sv = pca.singular_values();
        assert!(sv[0] >= sv[1]);
        let ratio = pca.explained_variance_ratio();
        assert_abs_diff_eq!(ratio.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mean_projects_to_zero() {
        let pca = train_pca(&training_data(), 3, 1e-12).unwrap();
        let p = pca.project(pca.mean()).unwrap();
        assert!(p.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn wrong_lengths_are_dimension_mismatches() {
        let pca = train_pca(&training_data(), 2, 1e-12).unwrap();
        assert_eq!(
            pca.project(&DVector::zeros(3)),
            Err(FitError::dimension("encode", 4, 3))
        );
        assert_eq!(
            pca.back_project(&DVector::zeros(3)),
            Err(FitError::dimension("decode", 2, 3))
        );
    }

    #[test]
    fn constant_data_cannot_be_trained() {
        let data = DMatrix::from_element(4, 3, 2.0);
        assert!(matches!(
            train_pca(&data, 2, 1e-9),
            Err(FitError::ModelConstructionFailed(_))
        ));
    }

    #[test]
    fn mismatched_basis_is_rejected() {
        let err = PcaBasis::new(DVector::zeros(3), DMatrix::identity(4, 2)).unwrap_err();
        assert!(matches!(err, FitError::ModelConstructionFailed(_)));
    }
}
