//! Read/write fit JSON files.
//!
//! A fit file is the portable record of one run:
//! - the criteria it ran under
//! - the outcome (best instance, error, termination, per-iteration history)
//! - the generating instance, when the target was synthetic

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FittedModelInstance, FittingCriteria};
use crate::error::AppError;
use crate::fit::FitOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub criteria: FittingCriteria,
    pub outcome: FitOutcome,
    pub truth: Option<FittedModelInstance>,
}

impl FitFile {
    pub fn new(
        criteria: &FittingCriteria,
        outcome: &FitOutcome,
        truth: Option<&FittedModelInstance>,
    ) -> Self {
        Self {
            tool: "aam".to_string(),
            created_at: Utc::now(),
            criteria: criteria.clone(),
            outcome: outcome.clone(),
            truth: truth.cloned(),
        }
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, fit)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))
}

/// Read a `FittingCriteria` JSON file; missing fields take their defaults.
pub fn read_criteria_json(path: &Path) -> Result<FittingCriteria, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open criteria JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid criteria JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::Termination;
    use nalgebra::Point2;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("aam-{}-{name}", std::process::id()))
    }

    #[test]
    fn fit_file_survives_a_write_read_cycle() {
        let outcome = FitOutcome {
            model: FittedModelInstance::at_mean(2, 1).with_origin(Point2::new(3.0, 4.0)),
            error: 1.5,
            iterations: 2,
            termination: Termination::Converged,
            history: vec![4.0, 2.0, 1.5],
            frontier_size: 3,
        };
        let truth = FittedModelInstance::at_mean(2, 1);
        let fit = FitFile::new(&FittingCriteria::default(), &outcome, Some(&truth));

        let path = temp_path("fit.json");
        write_fit_json(&path, &fit).unwrap();
        let back = read_fit_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.outcome, outcome);
        assert_eq!(back.truth, Some(truth));
        assert_eq!(back.tool, "aam");
    }

    #[test]
    fn criteria_file_fills_defaults() {
        let path = temp_path("criteria.json");
        std::fs::write(&path, r#"{ "max_tree_size": 3, "init_pos": [60.0, 60.0] }"#).unwrap();
        let crit = read_criteria_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(crit.max_tree_size, 3);
        assert_eq!(crit.init_pos, Point2::new(60.0, 60.0));
        assert_eq!(crit.num_max_iter, FittingCriteria::default().num_max_iter);
    }

    #[test]
    fn missing_files_map_to_exit_code_2() {
        let err = read_fit_json(Path::new("/nonexistent/fit.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
