//! The parametric-model contract shared by the shape and appearance models.
//!
//! A parametric model wraps a [`PcaBasis`] and converts between model
//! instances and K-dimensional parameter vectors:
//!
//! - `encode(instance)` -> parameters (projection)
//! - `decode(parameters)` -> instance (back-projection + reshape + placement)
//! - `perturbation_set()` -> the atomic search moves in parameter space
//!
//! Both variants carry a [`Placement`] (scale + translation) as part of the
//! shared contract, so callers never need to know which variant they hold to
//! position its output.

use nalgebra::{DVector, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::PcaBasis;

/// Default step magnitudes for perturbation sets. Each magnitude yields one
/// `+step` and one `-step` delta per dimension.
pub const DEFAULT_STEP_MAGNITUDES: [f64; 4] = [0.01, 0.1, 1.0, 10.0];

/// Similarity placement without rotation: `p -> p * scale + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub scale: f64,
    pub translation: Vector2<f64>,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translation: Vector2::zeros(),
        }
    }

    pub fn new(scale: f64, translation: Vector2<f64>) -> Result<Self, FitError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(FitError::ModelConstructionFailed(format!(
                "placement scale must be finite and > 0 (got {scale})"
            )));
        }
        if !(translation.x.is_finite() && translation.y.is_finite()) {
            return Err(FitError::ModelConstructionFailed(
                "placement translation must be finite".to_string(),
            ));
        }
        Ok(Self { scale, translation })
    }

    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        p * self.scale + self.translation
    }

    pub fn invert(&self, p: Point2<f64>) -> Point2<f64> {
        (p - self.translation) / self.scale
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

pub trait ParametricModel {
    type Instance;

    fn basis(&self) -> &PcaBasis;

    /// Placement applied by `decode`.
    fn placement(&self) -> Placement;

    /// Step magnitudes used by `perturbation_set`.
    fn step_magnitudes(&self) -> &[f64];

    /// Raw feature vector of an instance, with this model's placement undone.
    fn features(&self, instance: &Self::Instance) -> Result<DVector<f64>, FitError>;

    /// Decode under an explicit placement instead of the model's own.
    fn decode_placed(
        &self,
        params: &DVector<f64>,
        placement: Placement,
    ) -> Result<Self::Instance, FitError>;

    /// Number of retained principal components (K).
    fn dimension(&self) -> usize {
        self.basis().dimension()
    }

    fn encode(&self, instance: &Self::Instance) -> Result<DVector<f64>, FitError> {
        self.basis().project(&self.features(instance)?)
    }

    fn decode(&self, params: &DVector<f64>) -> Result<Self::Instance, FitError> {
        self.decode_placed(params, self.placement())
    }

    fn mean_instance(&self) -> Result<Self::Instance, FitError> {
        self.decode(&DVector::zeros(self.dimension()))
    }

    fn perturbation_set(&self) -> Vec<DVector<f64>> {
        perturbation_deltas(self.dimension(), self.step_magnitudes())
    }
}

/// For each step magnitude `s`, for each dimension `k`, emit `+s·e_k` then
/// `-s·e_k`. The result has `2 * steps.len() * dim` entries.
pub fn perturbation_deltas(dim: usize, steps: &[f64]) -> Vec<DVector<f64>> {
    let mut out = Vec::with_capacity(2 * steps.len() * dim);
    for &step in steps {
        for k in 0..dim {
            for signed in [step, -step] {
                let mut delta = DVector::zeros(dim);
                delta[k] = signed;
                out.push(delta);
            }
        }
    }
    out
}

pub(crate) fn validate_steps(steps: &[f64]) -> Result<(), FitError> {
    if let Some(bad) = steps.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(FitError::ModelConstructionFailed(format!(
            "step magnitudes must be finite and > 0 (got {bad})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_pair_plus_and_minus_per_dimension() {
        let deltas = perturbation_deltas(3, &[0.5, 2.0]);
        assert_eq!(deltas.len(), 2 * 2 * 3);

        assert_eq!(deltas[0].as_slice(), &[0.5, 0.0, 0.0]);
        assert_eq!(deltas[1].as_slice(), &[-0.5, 0.0, 0.0]);
        assert_eq!(deltas[2].as_slice(), &[0.0, 0.5, 0.0]);
        assert_eq!(deltas[6].as_slice(), &[2.0, 0.0, 0.0]);
        for d in &deltas {
            assert_eq!(d.iter().filter(|v| **v != 0.0).count(), 1);
        }
    }

    #[test]
    fn empty_menus_give_no_deltas() {
        assert!(perturbation_deltas(0, &DEFAULT_STEP_MAGNITUDES).is_empty());
        assert!(perturbation_deltas(4, &[]).is_empty());
    }

    #[test]
    fn placement_inverts() {
        let p = Placement::new(2.5, Vector2::new(-3.0, 4.0)).unwrap();
        let q = Point2::new(1.0, 2.0);
        let back = p.invert(p.apply(q));
        assert!((back - q).norm() < 1e-12);
        assert!(Placement::new(0.0, Vector2::zeros()).is_err());
    }
}
