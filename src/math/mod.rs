//! Numeric primitives: PCA projection and image resampling.

pub mod image;
pub mod pca;

pub use image::*;
pub use pca::*;
