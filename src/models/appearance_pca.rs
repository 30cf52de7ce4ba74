//! PCA appearance model.
//!
//! Textures are sampled on the bounding box of a reference mesh (the mean
//! shape). Decoding back-projects the parameters channel by channel onto that
//! reference grid, then resizes the result to the bound of the placed mesh.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::math::PcaBasis;
use crate::models::parametric::{validate_steps, DEFAULT_STEP_MAGNITUDES};
use crate::models::{Mesh, ParametricModel, Placement, Texture};

/// A texture bound to a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub mesh: Mesh,
    pub texture: Texture,
}

impl Appearance {
    /// Move the texture onto `mesh`, resizing it to the new bound.
    pub fn realigned(&self, mesh: Mesh) -> Appearance {
        let (w, h) = mesh.bound().pixel_size();
        Appearance {
            texture: self.texture.resized(w, h),
            mesh,
        }
    }

    /// Integer pixel position of the texture's top-left corner.
    pub fn pixel_origin(&self) -> (i64, i64) {
        let b = self.mesh.bound();
        (b.x.round() as i64, b.y.round() as i64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceModelPca {
    basis: PcaBasis,
    mean_mesh: Mesh,
    num_channels: usize,
    ref_width: usize,
    ref_height: usize,
    placement: Placement,
    steps: Vec<f64>,
}

impl AppearanceModelPca {
    pub fn new(basis: PcaBasis, mean_mesh: Mesh, num_channels: usize) -> Result<Self, FitError> {
        if num_channels == 0 {
            return Err(FitError::ModelConstructionFailed(
                "appearance model needs at least one channel".to_string(),
            ));
        }
        let (ref_width, ref_height) = mean_mesh.bound().pixel_size();
        let expected = ref_width * ref_height * num_channels;
        if basis.feature_len() != expected {
            return Err(FitError::dimension(
                "appearance basis",
                expected,
                basis.feature_len(),
            ));
        }
        Ok(Self {
            basis,
            mean_mesh,
            num_channels,
            ref_width,
            ref_height,
            placement: Placement::identity(),
            steps: DEFAULT_STEP_MAGNITUDES.to_vec(),
        })
    }

    pub fn with_steps(mut self, steps: Vec<f64>) -> Result<Self, FitError> {
        validate_steps(&steps)?;
        self.steps = steps;
        Ok(self)
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn mean_mesh(&self) -> &Mesh {
        &self.mean_mesh
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Size of the reference texture grid `(width, height)`.
    pub fn reference_size(&self) -> (usize, usize) {
        (self.ref_width, self.ref_height)
    }
}

impl ParametricModel for AppearanceModelPca {
    type Instance = Appearance;

    fn basis(&self) -> &PcaBasis {
        &self.basis
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn step_magnitudes(&self) -> &[f64] {
        &self.steps
    }

    fn features(&self, instance: &Appearance) -> Result<DVector<f64>, FitError> {
        let texture = &instance.texture;
        if texture.num_channels() != self.num_channels {
            return Err(FitError::dimension(
                "appearance channels",
                self.num_channels,
                texture.num_channels(),
            ));
        }
        Ok(texture
            .resized(self.ref_width, self.ref_height)
            .to_feature_vector())
    }

    fn decode_placed(
        &self,
        params: &DVector<f64>,
        placement: Placement,
    ) -> Result<Appearance, FitError> {
        let features = self.basis.back_project(params)?;
        let reference = Texture::from_feature_vector(
            &features,
            self.ref_width,
            self.ref_height,
            self.num_channels,
        )?;
        let mesh = self.mean_mesh.placed(placement.scale, placement.translation);
        let (w, h) = mesh.bound().pixel_size();
        Ok(Appearance {
            texture: reference.resized(w, h),
            mesh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, Point2, Vector2};

    use crate::math::train_pca;
    use crate::models::Shape;

    fn mean_mesh() -> Mesh {
        Mesh::new(Shape::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 3.0),
            Point2::new(0.0, 3.0),
        ]))
    }

    fn model() -> AppearanceModelPca {
        // 4x3 grid, 2 channels
        let rows: Vec<DVector<f64>> = (0..5)
            .map(|i| {
                Texture::from_fn(4, 3, 2, |x, y, c| {
                    (i as f64) * 0.1 * (x as f64) + (c as f64) * 0.5 + 0.2 * (y * i % 3) as f64
                })
                .to_feature_vector()
            })
            .collect();
        let data = DMatrix::from_fn(rows.len(), rows[0].len(), |i, j| rows[i][j]);
        let basis = train_pca(&data, 10, 1e-10).unwrap();
        AppearanceModelPca::new(basis, mean_mesh(), 2).unwrap()
    }

    #[test]
    fn mean_decodes_to_reference_size() {
        let m = model();
        let mean = m.mean_instance().unwrap();
        assert_eq!(m.reference_size(), (4, 3));
        assert_eq!((mean.texture.width(), mean.texture.height()), (4, 3));
        assert_eq!(mean.texture.num_channels(), 2);
        assert!(m.encode(&mean).unwrap().norm() < 1e-9);
    }

    #[test]
    fn placement_scales_the_texture_and_mesh() {
        let m = model();
        let p = Placement::new(2.0, Vector2::new(10.0, 20.0)).unwrap();
        let app = m.decode_placed(&DVector::zeros(m.dimension()), p).unwrap();
        assert_eq!((app.texture.width(), app.texture.height()), (8, 6));
        assert_eq!(app.pixel_origin(), (10, 20));

        let back = m.encode(&app).unwrap();
        assert!(back.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn realignment_follows_the_new_bound() {
        let m = model();
        let app = m.mean_instance().unwrap();
        let bigger = app.mesh.placed(3.0, Vector2::zeros());
        let moved = app.realigned(bigger);
        assert_eq!((moved.texture.width(), moved.texture.height()), (12, 9));
    }

    #[test]
    fn basis_size_must_match_reference_grid() {
        let basis = PcaBasis::new(DVector::zeros(10), DMatrix::identity(10, 2)).unwrap();
        assert!(matches!(
            AppearanceModelPca::new(basis, mean_mesh(), 2),
            Err(FitError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn encode_checks_channel_count() {
        let m = model();
        let instance = Appearance {
            mesh: mean_mesh(),
            texture: Texture::zeros(4, 3, 1),
        };
        assert!(matches!(m.encode(&instance), Err(FitError::DimensionMismatch { .. })));
    }
}
