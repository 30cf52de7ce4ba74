//! Command-line parsing for the AAM fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/search code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "aam", version, about = "Active Appearance Model beam-search fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train on a synthetic set, render a target, fit it, and report.
    Fit(FitArgs),
    /// Train on a synthetic set and print PCA diagnostics only.
    Train(TrainArgs),
}

/// Synthetic training-set options shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Number of training shapes.
    #[arg(long, default_value_t = 12)]
    pub shapes: usize,

    /// Landmarks per shape.
    #[arg(long, default_value_t = 8)]
    pub landmarks: usize,

    /// Radius of the generated contours (pixels).
    #[arg(long, default_value_t = 20.0)]
    pub radius: f64,

    /// Texture channels.
    #[arg(long, default_value_t = 1)]
    pub channels: usize,

    /// Random seed for the training set.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum principal components per model.
    #[arg(long, default_value_t = 8)]
    pub components: usize,

    /// Similarity-align training shapes before shape PCA.
    #[arg(long)]
    pub align: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub train: TrainArgs,

    /// Fitting criteria JSON. Flags below override individual fields.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Iteration budget.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Maximum frontier size.
    #[arg(long)]
    pub tree_size: Option<usize>,

    /// Candidates moved into the frontier per iteration.
    #[arg(long)]
    pub per_iter: Option<usize>,

    /// Relative-improvement convergence threshold.
    #[arg(long)]
    pub min_error: Option<f64>,

    /// Score candidates sequentially instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Target canvas size (pixels, square).
    #[arg(long, default_value_t = 120)]
    pub canvas: usize,

    /// Target origin offset from the canvas centre, `dx,dy`.
    #[arg(long, value_parser = parse_pair, default_value = "12,-8", allow_hyphen_values = true)]
    pub offset: (f64, f64),

    /// Target scale.
    #[arg(long, default_value_t = 1.2)]
    pub scale: f64,

    /// Render an ASCII overlay of the fit (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the fit outcome to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid number `{v}`: {e}"))
    };
    Ok((parse(a)?, parse(b)?))
}
