//! Shape, mesh, texture and the PCA models built on them.
//!
//! [`ParametricModel`] is the shared encode/decode contract; the fitter only
//! sees it through [`ActiveAppearanceModel`].

pub mod aam;
pub mod appearance_pca;
pub mod mesh;
pub mod parametric;
pub mod shape;
pub mod shape_pca;
pub mod texture;

pub use aam::{ActiveAppearanceModel, TrainingOptions};
pub use appearance_pca::{Appearance, AppearanceModelPca};
pub use mesh::Mesh;
pub use parametric::{perturbation_deltas, ParametricModel, Placement, DEFAULT_STEP_MAGNITUDES};
pub use shape::{Shape, ShapeCollection};
pub use shape_pca::ShapeModelPca;
pub use texture::Texture;
