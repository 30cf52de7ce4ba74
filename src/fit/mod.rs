//! Model fitting.
//!
//! - `priority`: score-ordered candidate list (frontier and per-iteration buffer)
//! - `actions`: the fixed menu of search moves
//! - `fitter`: the beam-search driver

pub mod actions;
pub mod fitter;
pub mod priority;

pub use actions::*;
pub use fitter::*;
pub use priority::*;
