//! Domain types used throughout the fitter.
//!
//! This module defines:
//!
//! - the search candidate (`FittedModelInstance`)
//! - run configuration (`FittingCriteria`)
//! - the fitting target (`Sample`)
//! - small geometry helpers (`Rect`)

pub mod types;

pub use types::*;
