//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - cloned cheaply during candidate generation
//! - exported to JSON after a run
//! - loaded from a JSON config (`FittingCriteria`)

use std::fmt;

use nalgebra::{DVector, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::models::{Shape, Texture};

/// One candidate solution of the search.
///
/// Instances are never mutated after creation; every search move produces a
/// new instance via the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModelInstance {
    shape_param: DVector<f64>,
    appearance_param: DVector<f64>,
    origin: Point2<f64>,
    scale: f64,
}

impl FittedModelInstance {
    pub fn new(
        shape_param: DVector<f64>,
        appearance_param: DVector<f64>,
        origin: Point2<f64>,
        scale: f64,
    ) -> Self {
        Self {
            shape_param,
            appearance_param,
            origin,
            scale,
        }
    }

    /// The mean model (all parameters zero) at the coordinate origin, unit scale.
    pub fn at_mean(shape_dim: usize, appearance_dim: usize) -> Self {
        Self::new(
            DVector::zeros(shape_dim),
            DVector::zeros(appearance_dim),
            Point2::origin(),
            1.0,
        )
    }

    pub fn shape_param(&self) -> &DVector<f64> {
        &self.shape_param
    }

    pub fn appearance_param(&self) -> &DVector<f64> {
        &self.appearance_param
    }

    pub fn origin(&self) -> Point2<f64> {
        self.origin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn with_origin(&self, origin: Point2<f64>) -> Self {
        Self {
            origin,
            ..self.clone()
        }
    }

    pub fn with_scale(&self, scale: f64) -> Self {
        Self {
            scale,
            ..self.clone()
        }
    }

    pub fn with_shape_param(&self, shape_param: DVector<f64>) -> Self {
        Self {
            shape_param,
            ..self.clone()
        }
    }

    pub fn with_appearance_param(&self, appearance_param: DVector<f64>) -> Self {
        Self {
            appearance_param,
            ..self.clone()
        }
    }
}

impl fmt::Display for FittedModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "origin = ({:.3}, {:.3})", self.origin.x, self.origin.y)?;
        writeln!(f, "scale  = {:.4}", self.scale)?;
        writeln!(f, "shape  = {}", fmt_params(&self.shape_param))?;
        write!(f, "app    = {}", fmt_params(&self.appearance_param))
    }
}

/// Search configuration for one fitting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FittingCriteria {
    /// Iteration budget.
    pub num_max_iter: usize,
    /// Maximum frontier size kept between iterations.
    pub max_tree_size: usize,
    /// How many of each iteration's best candidates enter the frontier.
    pub num_models_to_generate_per_iter: usize,
    /// Relative improvement at or below which the search is considered converged.
    pub min_error: f64,
    pub init_scale: f64,
    pub init_pos: Point2<f64>,
    /// Score candidates on the rayon pool. Output is identical either way.
    pub parallel: bool,
}

impl Default for FittingCriteria {
    fn default() -> Self {
        Self {
            num_max_iter: 20,
            max_tree_size: 10,
            num_models_to_generate_per_iter: 5,
            min_error: 1e-4,
            init_scale: 1.0,
            init_pos: Point2::origin(),
            parallel: true,
        }
    }
}

impl FittingCriteria {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.max_tree_size == 0 {
            return Err(FitError::InvalidCriteria(
                "max_tree_size must be >= 1".to_string(),
            ));
        }
        if self.num_models_to_generate_per_iter == 0 {
            return Err(FitError::InvalidCriteria(
                "num_models_to_generate_per_iter must be >= 1".to_string(),
            ));
        }
        if !(self.init_scale.is_finite() && self.init_scale > 0.0) {
            return Err(FitError::InvalidCriteria(format!(
                "init_scale must be finite and > 0 (got {})",
                self.init_scale
            )));
        }
        if !self.min_error.is_finite() {
            return Err(FitError::InvalidCriteria(
                "min_error must be finite".to_string(),
            ));
        }
        if !(self.init_pos.x.is_finite() && self.init_pos.y.is_finite()) {
            return Err(FitError::InvalidCriteria(
                "init_pos must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for FittingCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fitting criteria:")?;
        writeln!(f, "...num max iter      = {}", self.num_max_iter)?;
        writeln!(f, "...max tree size     = {}", self.max_tree_size)?;
        writeln!(f, "...models per iter   = {}", self.num_models_to_generate_per_iter)?;
        writeln!(f, "...min error         = {}", self.min_error)?;
        writeln!(f, "...init scale        = {}", self.init_scale)?;
        write!(
            f,
            "...init pos          = ({}, {})",
            self.init_pos.x, self.init_pos.y
        )
    }
}

/// The target observation a model is fitted against.
///
/// Landmarks are required; the image is optional. Without an image only the
/// shape term contributes to the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub landmarks: Shape,
    pub image: Option<Texture>,
}

impl Sample {
    pub fn from_landmarks(landmarks: Shape) -> Self {
        Self {
            landmarks,
            image: None,
        }
    }

    pub fn with_image(landmarks: Shape, image: Texture) -> Self {
        Self {
            landmarks,
            image: Some(image),
        }
    }
}

/// Axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Integer pixel size covering this rectangle (at least 1x1).
    pub fn pixel_size(&self) -> (usize, usize) {
        let w = self.width.round().max(1.0) as usize;
        let h = self.height.round().max(1.0) as usize;
        (w, h)
    }

    /// Rectangle after `p -> p * scale + shift`.
    pub fn placed(&self, scale: f64, shift: Vector2<f64>) -> Rect {
        Rect::new(
            self.x * scale + shift.x,
            self.y * scale + shift.y,
            self.width * scale,
            self.height * scale,
        )
    }
}

fn fmt_params(values: &DVector<f64>) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_leave_parent_untouched() {
        let parent = FittedModelInstance::at_mean(2, 3);
        let child = parent.with_scale(2.0).with_origin(Point2::new(1.0, -1.0));

        assert_eq!(parent.scale(), 1.0);
        assert_eq!(parent.origin(), Point2::origin());
        assert_eq!(child.scale(), 2.0);
        assert_eq!(child.origin(), Point2::new(1.0, -1.0));
        assert_eq!(child.shape_param(), parent.shape_param());
    }

    #[test]
    fn criteria_validation_rejects_zero_tree() {
        let crit = FittingCriteria {
            max_tree_size: 0,
            ..FittingCriteria::default()
        };
        assert!(matches!(crit.validate(), Err(FitError::InvalidCriteria(_))));
        assert!(FittingCriteria::default().validate().is_ok());
    }

    #[test]
    fn criteria_json_fills_missing_fields_with_defaults() {
        let crit: FittingCriteria =
            serde_json::from_str(r#"{ "num_max_iter": 3, "init_scale": 2.0 }"#).unwrap();
        assert_eq!(crit.num_max_iter, 3);
        assert_eq!(crit.init_scale, 2.0);
        assert_eq!(crit.max_tree_size, FittingCriteria::default().max_tree_size);
    }

    #[test]
    fn rect_placement_and_pixel_size() {
        let r = Rect::new(-10.0, -5.0, 20.0, 10.0);
        let p = r.placed(2.0, Vector2::new(100.0, 50.0));
        assert_eq!(p, Rect::new(80.0, 40.0, 40.0, 20.0));
        assert_eq!(p.pixel_size(), (40, 20));
        assert_eq!(Rect::new(0.0, 0.0, 0.2, 0.2).pixel_size(), (1, 1));
    }
}
