//! Active appearance model: a shape model and an appearance model trained on
//! the same landmark set, plus the error metric the fitter minimises.

use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{FittedModelInstance, Rect, Sample};
use crate::error::FitError;
use crate::math::train_pca;
use crate::models::parametric::DEFAULT_STEP_MAGNITUDES;
use crate::models::{
    Appearance, AppearanceModelPca, ParametricModel, Placement, ShapeCollection, ShapeModelPca,
    Texture,
};

/// Knobs for [`ActiveAppearanceModel::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub shape_components: usize,
    pub appearance_components: usize,
    /// Relative singular-value cutoff, see [`train_pca`].
    pub tolerance: f64,
    pub shape_steps: Vec<f64>,
    pub appearance_steps: Vec<f64>,
    /// Similarity-align the training shapes before shape PCA.
    pub align_shapes: bool,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            shape_components: 8,
            appearance_components: 8,
            tolerance: 1e-8,
            shape_steps: DEFAULT_STEP_MAGNITUDES.to_vec(),
            appearance_steps: DEFAULT_STEP_MAGNITUDES.to_vec(),
            align_shapes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAppearanceModel {
    shape: ShapeModelPca,
    appearance: AppearanceModelPca,
}

impl ActiveAppearanceModel {
    pub fn new(shape: ShapeModelPca, appearance: AppearanceModelPca) -> Result<Self, FitError> {
        let app_landmarks = appearance.mean_mesh().shape().len();
        if app_landmarks != shape.num_landmarks() {
            return Err(FitError::dimension(
                "appearance reference mesh",
                shape.num_landmarks(),
                app_landmarks,
            ));
        }
        Ok(Self { shape, appearance })
    }

    /// Train both PCA models.
    ///
    /// `textures[i]` is the appearance of `shapes[i]`; each is resized to the
    /// bound of the mean shape before flattening.
    pub fn train(
        shapes: &ShapeCollection,
        textures: &[Texture],
        opts: &TrainingOptions,
    ) -> Result<Self, FitError> {
        if shapes.is_empty() {
            return Err(FitError::ModelConstructionFailed(
                "training set is empty".to_string(),
            ));
        }
        if textures.len() != shapes.len() {
            return Err(FitError::dimension(
                "training textures",
                shapes.len(),
                textures.len(),
            ));
        }

        let aligned;
        let shapes = if opts.align_shapes {
            aligned = shapes.aligned()?;
            &aligned
        } else {
            shapes
        };

        let shape_basis = train_pca(&shapes.to_matrix(), opts.shape_components, opts.tolerance)?;
        let shape = ShapeModelPca::new(shape_basis)?.with_steps(opts.shape_steps.clone())?;
        let mean_mesh = shape.mean_instance()?;

        let num_channels = textures[0].num_channels();
        let (ref_w, ref_h) = mean_mesh.bound().pixel_size();
        let mut data = DMatrix::zeros(textures.len(), ref_w * ref_h * num_channels);
        for (i, t) in textures.iter().enumerate() {
            if t.num_channels() != num_channels {
                return Err(FitError::dimension(
                    "training texture channels",
                    num_channels,
                    t.num_channels(),
                ));
            }
            let v = t.resized(ref_w, ref_h).to_feature_vector();
            data.row_mut(i).copy_from(&v.transpose());
        }

        let app_basis = train_pca(&data, opts.appearance_components, opts.tolerance)?;
        let appearance = AppearanceModelPca::new(app_basis, mean_mesh, num_channels)?
            .with_steps(opts.appearance_steps.clone())?;

        info!(
            "trained AAM: {} shapes, {} landmarks, shape K={}, appearance K={} ({}x{}x{})",
            shapes.len(),
            shape.num_landmarks(),
            shape.dimension(),
            appearance.dimension(),
            ref_w,
            ref_h,
            num_channels
        );
        Self::new(shape, appearance)
    }

    pub fn shape_model(&self) -> &ShapeModelPca {
        &self.shape
    }

    pub fn appearance_model(&self) -> &AppearanceModelPca {
        &self.appearance
    }

    pub fn num_landmarks(&self) -> usize {
        self.shape.num_landmarks()
    }

    /// Mean model, zero parameters at the coordinate origin and unit scale.
    pub fn mean_seed(&self) -> FittedModelInstance {
        FittedModelInstance::at_mean(self.shape.dimension(), self.appearance.dimension())
    }

    /// Decode a candidate into a placed mesh with its texture.
    pub fn instantiate(&self, candidate: &FittedModelInstance) -> Result<Appearance, FitError> {
        self.check_instance(candidate)?;
        let placement = candidate_placement(candidate);
        let mesh = self.shape.decode_placed(candidate.shape_param(), placement)?;
        let app = self
            .appearance
            .decode_placed(candidate.appearance_param(), placement)?;
        Ok(app.realigned(mesh))
    }

    /// Fitting error of `candidate` against `sample`.
    ///
    /// The shape term is the Procrustes distance to the sample landmarks. When
    /// the sample carries an image, the sum of squared texture differences at
    /// the candidate's pixel position is added.
    pub fn measure_error(
        &self,
        candidate: &FittedModelInstance,
        sample: &Sample,
    ) -> Result<f64, FitError> {
        self.check_instance(candidate)?;
        if sample.landmarks.len() != self.num_landmarks() {
            return Err(FitError::dimension(
                "sample landmarks",
                self.num_landmarks(),
                sample.landmarks.len(),
            ));
        }

        let placement = candidate_placement(candidate);
        let mesh = self.shape.decode_placed(candidate.shape_param(), placement)?;
        let mut error = mesh.shape().procrustes_distance(&sample.landmarks)?;

        if let Some(image) = &sample.image {
            if image.num_channels() != self.appearance.num_channels() {
                return Err(FitError::dimension(
                    "sample image channels",
                    self.appearance.num_channels(),
                    image.num_channels(),
                ));
            }
            // Reject before decoding so oversized candidates never allocate.
            check_fits(mesh.bound(), image)?;
            let app = self
                .appearance
                .decode_placed(candidate.appearance_param(), placement)?
                .realigned(mesh);
            let (x, y) = app.pixel_origin();
            error += image.window_sse(&app.texture, x, y)?;
        }

        if !error.is_finite() {
            return Err(FitError::NonFiniteError);
        }
        Ok(error)
    }

    fn check_instance(&self, candidate: &FittedModelInstance) -> Result<(), FitError> {
        if candidate.shape_param().len() != self.shape.dimension() {
            return Err(FitError::dimension(
                "shape parameters",
                self.shape.dimension(),
                candidate.shape_param().len(),
            ));
        }
        if candidate.appearance_param().len() != self.appearance.dimension() {
            return Err(FitError::dimension(
                "appearance parameters",
                self.appearance.dimension(),
                candidate.appearance_param().len(),
            ));
        }
        Ok(())
    }
}

fn candidate_placement(candidate: &FittedModelInstance) -> Placement {
    Placement {
        scale: candidate.scale(),
        translation: candidate.origin().coords,
    }
}

fn check_fits(bound: Rect, image: &Texture) -> Result<(), FitError> {
    let x = bound.x.round();
    let y = bound.y.round();
    let (w, h) = bound.pixel_size();
    let fits = x >= 0.0
        && y >= 0.0
        && x + w as f64 <= image.width() as f64
        && y + h as f64 <= image.height() as f64;
    if fits {
        return Ok(());
    }
    Err(FitError::CandidateOutOfBounds {
        x: x as i64,
        y: y as i64,
        width: w,
        height: h,
        image_width: image.width(),
        image_height: image.height(),
    })
}
