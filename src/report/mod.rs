//! Reporting utilities: parameter residuals against a known truth.

pub mod format;

pub use format::*;

use serde::{Deserialize, Serialize};

use crate::domain::FittedModelInstance;
use crate::error::FitError;
use crate::models::Shape;

/// How far a fitted instance is from the instance that generated the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterResidual {
    /// Euclidean distance between origins (pixels).
    pub origin_offset: f64,
    /// `fitted.scale / truth.scale`.
    pub scale_ratio: f64,
    pub shape_rmse: f64,
    pub appearance_rmse: f64,
    /// Root-mean-square landmark distance (pixels), when landmarks were compared.
    pub landmark_rmse: Option<f64>,
}

impl ParameterResidual {
    /// Add the landmark RMSE between the truth and fitted placed shapes.
    pub fn with_landmarks(mut self, truth: &Shape, fitted: &Shape) -> Result<Self, FitError> {
        let sq = truth.squared_difference(fitted)?;
        let total: f64 = sq.points().iter().map(|p| p.x + p.y).sum();
        self.landmark_rmse = Some(if sq.is_empty() {
            0.0
        } else {
            (total / sq.len() as f64).sqrt()
        });
        Ok(self)
    }
}

pub fn compute_parameter_residual(
    truth: &FittedModelInstance,
    fitted: &FittedModelInstance,
) -> Result<ParameterResidual, FitError> {
    let shape_rmse = rmse(truth.shape_param().as_slice(), fitted.shape_param().as_slice())
        .ok_or_else(|| {
            FitError::dimension(
                "shape parameters",
                truth.shape_param().len(),
                fitted.shape_param().len(),
            )
        })?;
    let appearance_rmse = rmse(
        truth.appearance_param().as_slice(),
        fitted.appearance_param().as_slice(),
    )
    .ok_or_else(|| {
        FitError::dimension(
            "appearance parameters",
            truth.appearance_param().len(),
            fitted.appearance_param().len(),
        )
    })?;
    Ok(ParameterResidual {
        origin_offset: (fitted.origin() - truth.origin()).norm(),
        scale_ratio: fitted.scale() / truth.scale(),
        shape_rmse,
        appearance_rmse,
        landmark_rmse: None,
    })
}

fn rmse(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    if a.is_empty() {
        return Some(0.0);
    }
    let sse: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some((sse / a.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DVector, Point2};

    #[test]
    fn residual_against_truth() {
        let truth = FittedModelInstance::new(
            DVector::from_vec(vec![1.0, 1.0]),
            DVector::from_vec(vec![0.0]),
            Point2::new(10.0, 10.0),
            2.0,
        );
        let fitted = truth
            .with_origin(Point2::new(13.0, 14.0))
            .with_scale(3.0)
            .with_shape_param(DVector::from_vec(vec![1.0, -1.0]));
        let r = compute_parameter_residual(&truth, &fitted).unwrap();
        assert_eq!(r.origin_offset, 5.0);
        assert_eq!(r.scale_ratio, 1.5);
        assert!((r.shape_rmse - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(r.appearance_rmse, 0.0);

        let mismatched = fitted.with_appearance_param(DVector::zeros(2));
        assert!(compute_parameter_residual(&truth, &mismatched).is_err());
    }

    #[test]
    fn landmark_rmse_is_per_point_distance() {
        let truth = FittedModelInstance::at_mean(1, 1);
        let base = Shape::new(vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0)]);
        let fitted = Shape::new(vec![Point2::new(3.0, 4.0), Point2::new(4.0, 0.0)]);

        let r = compute_parameter_residual(&truth, &truth).unwrap();
        assert_eq!(r.landmark_rmse, None);
        let r = r.with_landmarks(&base, &fitted).unwrap();
        // distances 5 and 0
        assert!((r.landmark_rmse.unwrap() - 12.5_f64.sqrt()).abs() < 1e-12);

        let short = Shape::new(vec![Point2::origin()]);
        assert!(r.with_landmarks(&base, &short).is_err());
    }
}
