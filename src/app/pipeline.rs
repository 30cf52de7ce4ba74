//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! synthetic training set -> AAM training -> target rendering -> beam search -> residuals
//!
//! The binary can then focus on presentation.

use nalgebra::{Point2, Vector2};

use crate::data::{SyntheticConfig, generate_target, generate_training_set};
use crate::domain::{FittedModelInstance, FittingCriteria, Sample};
use crate::error::AppError;
use crate::fit::{FitOutcome, ModelFitter};
use crate::models::{ActiveAppearanceModel, ParametricModel, TrainingOptions};
use crate::report::{ParameterResidual, compute_parameter_residual};

/// Everything a single run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub synthetic: SyntheticConfig,
    pub training: TrainingOptions,
    pub criteria: FittingCriteria,
    /// Side of the square target image (pixels).
    pub canvas: usize,
    /// Truth origin relative to the canvas centre.
    pub truth_offset: Vector2<f64>,
    pub truth_scale: f64,
    /// Weight of the first shape component in the truth instance.
    pub truth_shape_weight: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        let canvas = 120;
        let centre = canvas as f64 / 2.0;
        Self {
            synthetic: SyntheticConfig::default(),
            training: TrainingOptions::default(),
            criteria: FittingCriteria {
                init_pos: Point2::new(centre, centre),
                ..FittingCriteria::default()
            },
            canvas,
            truth_offset: Vector2::new(12.0, -8.0),
            truth_scale: 1.2,
            truth_shape_weight: 2.0,
        }
    }
}

impl RunConfig {
    pub fn canvas_centre(&self) -> Point2<f64> {
        let c = self.canvas as f64 / 2.0;
        Point2::new(c, c)
    }
}

/// All computed outputs of a single `aam fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub model: ActiveAppearanceModel,
    pub truth: FittedModelInstance,
    pub sample: Sample,
    pub criteria: FittingCriteria,
    pub outcome: FitOutcome,
    pub residual: ParameterResidual,
}

/// Generate the synthetic training set and train the AAM.
pub fn train_model(config: &RunConfig) -> Result<ActiveAppearanceModel, AppError> {
    let set = generate_training_set(&config.synthetic)?;
    Ok(ActiveAppearanceModel::train(&set.shapes, &set.textures, &config.training)?)
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Train.
    let model = train_model(config)?;

    // 2) Render the target from a known instance.
    let mut shape_param = model.mean_seed().shape_param().clone();
    if model.shape_model().dimension() > 0 {
        shape_param[0] = config.truth_shape_weight;
    }
    let truth = model
        .mean_seed()
        .with_shape_param(shape_param)
        .with_origin(config.canvas_centre() + config.truth_offset)
        .with_scale(config.truth_scale);
    let sample = generate_target(&model, &truth, config.canvas)?;

    // 3) Search from the mean model.
    let fitter = ModelFitter::new(&model, &sample, config.criteria.clone())?;
    let outcome = fitter.fit(Some(&model.mean_seed()))?;

    // 4) Compare with the truth.
    let fitted = model.instantiate(&outcome.model)?;
    let residual = compute_parameter_residual(&truth, &outcome.model)?
        .with_landmarks(&sample.landmarks, fitted.mesh.shape())?;

    Ok(RunOutput {
        model,
        truth,
        sample,
        criteria: config.criteria.clone(),
        outcome,
        residual,
    })
}
