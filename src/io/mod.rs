//! Input/output helpers.
//!
//! - fit result and criteria JSON (`export`)

pub mod export;

pub use export::*;
