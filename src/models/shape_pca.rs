//! PCA shape model.
//!
//! Feature vectors are flattened landmark coordinates. Decoded instances are
//! meshes that share the triangulation of the mean shape.

use nalgebra::DVector;

use crate::error::FitError;
use crate::math::PcaBasis;
use crate::models::parametric::{validate_steps, DEFAULT_STEP_MAGNITUDES};
use crate::models::{Mesh, ParametricModel, Placement, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeModelPca {
    basis: PcaBasis,
    triangles: Vec<[usize; 3]>,
    placement: Placement,
    steps: Vec<f64>,
}

impl ShapeModelPca {
    pub fn new(basis: PcaBasis) -> Result<Self, FitError> {
        let mean = Shape::from_flat(basis.mean())?;
        if mean.len() < 3 {
            return Err(FitError::ModelConstructionFailed(format!(
                "shape model needs at least 3 landmarks (got {})",
                mean.len()
            )));
        }
        let triangles = Mesh::new(mean).triangles().to_vec();
        Ok(Self {
            basis,
            triangles,
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

    pub fn num_landmarks(&self) -> usize {
        self.basis.feature_len() / 2
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The PCA mean as a landmark sequence, without placement.
    pub fn mean_shape(&self) -> Result<Shape, FitError> {
        Shape::from_flat(self.basis.mean())
    }
}

impl ParametricModel for ShapeModelPca {
    type Instance = Mesh;

    fn basis(&self) -> &PcaBasis {
        &self.basis
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn step_magnitudes(&self) -> &[f64] {
        &self.steps
    }

    fn features(&self, instance: &Mesh) -> Result<DVector<f64>, FitError> {
        let shape = instance.shape();
        if shape.len() != self.num_landmarks() {
            return Err(FitError::dimension("shape encode", self.num_landmarks(), shape.len()));
        }
        let unplaced = Shape::new(
            shape
                .points()
                .iter()
                .map(|&p| self.placement.invert(p))
                .collect(),
        );
        Ok(unplaced.to_flat())
    }

    fn decode_placed(&self, params: &DVector<f64>, placement: Placement) -> Result<Mesh, FitError> {
        let flat = self.basis.back_project(params)?;
        let shape =
            Shape::from_flat(&flat)?.recentre_and_scale(placement.translation, placement.scale);
        Mesh::with_triangles(shape, self.triangles.clone())
    }
}
