//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - trains the model on a synthetic set
//! - renders a target and fits it
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use log::info;
use nalgebra::{Point2, Vector2};

use crate::app::pipeline::RunConfig;
use crate::cli::{Command, FitArgs, TrainArgs};
use crate::data::SyntheticConfig;
use crate::error::AppError;
use crate::io::export::{FitFile, read_criteria_json, write_fit_json};
use crate::models::TrainingOptions;

pub mod pipeline;

/// Entry point for the `aam` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Train(args) => handle_train(args),
    }
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = RunConfig {
        synthetic: synthetic_from_args(&args),
        training: training_from_args(&args),
        ..RunConfig::default()
    };
    let model = pipeline::train_model(&config)?;
    println!("{}", crate::report::format_training_summary(&model));
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    info!("fitting on a {0}x{0} canvas", config.canvas);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_training_summary(&run.model));
    println!(
        "{}",
        crate::report::format_fit_summary(
            &run.outcome,
            &run.criteria,
            Some((&run.truth, &run.residual)),
        )
    );

    if args.plot && !args.no_plot {
        let fitted = run.model.instantiate(&run.outcome.model)?;
        let plot = crate::plot::render_shape_overlay(
            &run.sample.landmarks,
            &fitted.mesh,
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        let file = FitFile::new(&run.criteria, &run.outcome, Some(&run.truth));
        write_fit_json(path, &file)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}

pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    let defaults = RunConfig::default();
    let centre = args.canvas as f64 / 2.0;

    // A config file is taken as-is; without one the search starts at the
    // canvas centre.
    let mut criteria = match &args.config {
        Some(path) => read_criteria_json(path)?,
        None => crate::domain::FittingCriteria {
            init_pos: Point2::new(centre, centre),
            ..defaults.criteria.clone()
        },
    };
    if let Some(v) = args.max_iter {
        criteria.num_max_iter = v;
    }
    if let Some(v) = args.tree_size {
        criteria.max_tree_size = v;
    }
    if let Some(v) = args.per_iter {
        criteria.num_models_to_generate_per_iter = v;
    }
    if let Some(v) = args.min_error {
        criteria.min_error = v;
    }
    if args.sequential {
        criteria.parallel = false;
    }
    criteria.validate()?;

    Ok(RunConfig {
        synthetic: synthetic_from_args(&args.train),
        training: training_from_args(&args.train),
        criteria,
        canvas: args.canvas,
        truth_offset: Vector2::new(args.offset.0, args.offset.1),
        truth_scale: args.scale,
        ..defaults
    })
}

fn synthetic_from_args(args: &TrainArgs) -> SyntheticConfig {
    SyntheticConfig {
        num_shapes: args.shapes,
        num_landmarks: args.landmarks,
        radius: args.radius,
        num_channels: args.channels,
        seed: args.seed,
        ..SyntheticConfig::default()
    }
}

fn training_from_args(args: &TrainArgs) -> TrainingOptions {
    TrainingOptions {
        shape_components: args.components,
        appearance_components: args.components,
        align_shapes: args.align,
        ..TrainingOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn fit_args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["aam", "fit"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Fit(args) => args,
            Command::Train(_) => unreachable!(),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let config = run_config_from_args(&fit_args(&["--max-iter", "4", "--sequential"])).unwrap();
        assert_eq!(config.criteria.num_max_iter, 4);
        assert!(!config.criteria.parallel);
        assert_eq!(config.criteria.init_pos, Point2::new(60.0, 60.0));
        assert_eq!(config.truth_offset, Vector2::new(12.0, -8.0));
    }

    #[test]
    fn invalid_flags_map_to_exit_code_2() {
        let err = run_config_from_args(&fit_args(&["--tree-size", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
