//! Seeded synthetic data for training and fitting runs.

pub mod sample;

pub use sample::*;
