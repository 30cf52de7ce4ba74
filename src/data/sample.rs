//! Synthetic training sets and targets.
//!
//! Training shapes are noisy regular polygons: landmark `n` of `L` sits at
//! angle `2πn/L + u·angle_noise` on a circle of `radius`, then both
//! coordinates get an opposite-signed jitter of up to `point_noise`. Shapes
//! are centred on the coordinate origin; the fitter places them via
//! `init_pos`.
//!
//! Textures are smooth per-channel gradients with a random slope and offset,
//! sized to each shape's bound.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{FittedModelInstance, Sample};
use crate::error::FitError;
use crate::models::{ActiveAppearanceModel, Shape, ShapeCollection, Texture};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub num_shapes: usize,
    pub num_landmarks: usize,
    pub radius: f64,
    /// Maximum angular offset per landmark (radians).
    pub angle_noise: f64,
    /// Maximum coordinate jitter per landmark (pixels).
    pub point_noise: f64,
    pub num_channels: usize,
    /// Standard deviation of per-pixel texture noise.
    pub texture_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_shapes: 12,
            num_landmarks: 8,
            radius: 20.0,
            angle_noise: 0.133,
            point_noise: 1.5,
            num_channels: 1,
            texture_noise: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if self.num_shapes < 2 {
            return Err(FitError::ModelConstructionFailed(
                "need at least 2 training shapes".to_string(),
            ));
        }
        if self.num_landmarks < 3 {
            return Err(FitError::ModelConstructionFailed(
                "need at least 3 landmarks per shape".to_string(),
            ));
        }
        if self.num_channels == 0 {
            return Err(FitError::ModelConstructionFailed(
                "textures need at least one channel".to_string(),
            ));
        }
        let finite = [self.radius, self.angle_noise, self.point_noise, self.texture_noise];
        if finite.iter().any(|v| !v.is_finite() || *v < 0.0) || self.radius == 0.0 {
            return Err(FitError::ModelConstructionFailed(
                "radius must be > 0 and noise levels >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub shapes: ShapeCollection,
    pub textures: Vec<Texture>,
}

pub fn generate_training_set(config: &SyntheticConfig) -> Result<TrainingSet, FitError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let pixel_noise = Normal::new(0.0, config.texture_noise)
        .map_err(|e| FitError::ModelConstructionFailed(format!("texture noise: {e}")))?;

    let l = config.num_landmarks;
    let mut shapes = Vec::with_capacity(config.num_shapes);
    for _ in 0..config.num_shapes {
        let points = (0..l)
            .map(|n| {
                let nr = config.angle_noise * rng.gen_range(0.0..1.0);
                let angle = std::f64::consts::TAU * n as f64 / l as f64 + nr;
                let n0 = config.point_noise * rng.gen_range(0.0..1.0);
                let n1 = config.point_noise * rng.gen_range(0.0..1.0);
                nalgebra::Point2::new(
                    config.radius * angle.cos() + n0 - n1,
                    config.radius * angle.sin() - n0 + n1,
                )
            })
            .collect();
        shapes.push(Shape::new(points));
    }
    let shapes = ShapeCollection::new(shapes)?.centred();

    let mut textures = Vec::with_capacity(shapes.len());
    for shape in shapes.shapes() {
        let (w, h) = shape.bound().pixel_size();
        let slopes: Vec<(f64, f64, f64)> = (0..config.num_channels)
            .map(|_| {
                (
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(0.0..0.5),
                )
            })
            .collect();
        let noise: Vec<f64> = (0..w * h * config.num_channels)
            .map(|_| pixel_noise.sample(&mut rng))
            .collect();
        textures.push(Texture::from_fn(w, h, config.num_channels, |x, y, c| {
            let (a, b, offset) = slopes[c];
            let u = x as f64 / w as f64;
            let v = y as f64 / h as f64;
            offset + a * u + b * v + noise[(c * h + y) * w + x]
        }));
    }

    Ok(TrainingSet { shapes, textures })
}

/// Render `truth` onto a blank `canvas x canvas` image.
///
/// The sample's landmarks are the placed decoded shape of `truth`, so scoring
/// `truth` itself against the result gives exactly zero error.
pub fn generate_target(
    model: &ActiveAppearanceModel,
    truth: &FittedModelInstance,
    canvas: usize,
) -> Result<Sample, FitError> {
    let app = model.instantiate(truth)?;
    let (x, y) = app.pixel_origin();
    let image = Texture::zeros(canvas, canvas, model.appearance_model().num_channels())
        .composited(&app.texture, x, y)?;
    Ok(Sample::with_image(app.mesh.shape().clone(), image))
}
