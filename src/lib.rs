//! `aam-search` library crate.
//!
//! Active Appearance Model fitting by beam search. The binary (`aam`) is a
//! thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the models and the fitter are usable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
