//! Formatted terminal output.
//!
//! We keep formatting code in one place so the model and fitting code stays
//! free of presentation concerns.

use crate::domain::{FittedModelInstance, FittingCriteria};
use crate::fit::FitOutcome;
use crate::models::{ActiveAppearanceModel, ParametricModel};
use crate::report::ParameterResidual;

/// PCA diagnostics for a trained model.
pub fn format_training_summary(model: &ActiveAppearanceModel) -> String {
    let shape = model.shape_model();
    let app = model.appearance_model();
    let (w, h) = app.reference_size();

    let mut out = String::new();
    out.push_str("=== aam - Active Appearance Model ===\n");
    out.push_str(&format!(
        "Landmarks: {} | triangles: {}\n",
        model.num_landmarks(),
        shape.triangles().len()
    ));
    out.push_str(&format!(
        "Reference texture: {w}x{h} x {} channel(s)\n",
        app.num_channels()
    ));

    out.push_str("\nShape model:\n");
    out.push_str(&format_components(shape.dimension(), shape.basis().explained_variance_ratio()));
    out.push_str("\nAppearance model:\n");
    out.push_str(&format_components(app.dimension(), app.basis().explained_variance_ratio()));
    out
}

/// Criteria, outcome and (optionally) the distance to the known truth.
pub fn format_fit_summary(
    outcome: &FitOutcome,
    criteria: &FittingCriteria,
    truth: Option<(&FittedModelInstance, &ParameterResidual)>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{criteria}\n\n"));
    out.push_str(&format!("{outcome}\n"));

    out.push_str("\nError history:\n");
    out.push_str(&format_history(&outcome.history));

    if let Some((truth, residual)) = truth {
        out.push_str("\nTruth:\n");
        out.push_str(&format!("{truth}\n"));
        out.push_str(&format!(
            "- origin offset : {:.3}px\n- scale ratio   : {:.4}\n- shape RMSE    : {:.4}\n- app RMSE      : {:.4}\n",
            residual.origin_offset,
            residual.scale_ratio,
            residual.shape_rmse,
            residual.appearance_rmse
        ));
        if let Some(rmse) = residual.landmark_rmse {
            out.push_str(&format!("- landmark RMSE : {rmse:.3}px\n"));
        }
    }
    out
}

fn format_components(k: usize, ratios: Vec<f64>) -> String {
    let mut out = format!("  K = {k}\n");
    let mut cumulative = 0.0;
    for (i, r) in ratios.iter().enumerate() {
        cumulative += r;
        out.push_str(&format!(
            "  pc{:<3} {:>7.2}%  (cum {:>6.2}%)\n",
            i + 1,
            100.0 * r,
            100.0 * cumulative
        ));
    }
    out
}

fn format_history(history: &[f64]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>16}\n", "iter", "best error"));
    out.push_str(&format!("{:-<6} {:-<16}\n", "", ""));
    for (i, e) in history.iter().enumerate() {
        out.push_str(&format!("{i:<6} {e:>16.6}\n"));
    }
    out
}
