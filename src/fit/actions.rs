//! Search moves.
//!
//! Every move clones its parent and changes exactly one field group. Moves are
//! generated per action class in the fixed order of [`SearchAction::ALL`].

use std::fmt;

use nalgebra::{DVector, Vector2};
use serde::{Deserialize, Serialize};

use crate::domain::FittedModelInstance;
use crate::error::FitError;
use crate::models::{ActiveAppearanceModel, ParametricModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAction {
    Scaling,
    Translation,
    Reshaping,
    Reappearancing,
}

impl SearchAction {
    pub const ALL: [SearchAction; 4] = [
        SearchAction::Scaling,
        SearchAction::Translation,
        SearchAction::Reshaping,
        SearchAction::Reappearancing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SearchAction::Scaling => "SCALING",
            SearchAction::Translation => "TRANSLATION",
            SearchAction::Reshaping => "RESHAPING",
            SearchAction::Reappearancing => "REAPP",
        }
    }
}

impl fmt::Display for SearchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed menus for the scaling and translation classes, plus which action
/// classes are enabled at all. Reshaping/reappearancing deltas come from the
/// models' perturbation sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionMenu {
    pub scales: Vec<f64>,
    pub translations: Vec<Vector2<f64>>,
    pub enabled: Vec<SearchAction>,
}

impl Default for ActionMenu {
    fn default() -> Self {
        let translations = [5.0, 10.0, 25.0]
            .into_iter()
            .flat_map(|m| {
                [
                    Vector2::new(-m, 0.0),
                    Vector2::new(0.0, -m),
                    Vector2::new(m, 0.0),
                    Vector2::new(0.0, m),
                ]
            })
            .collect();
        Self {
            scales: vec![1.01, 0.99, 1.5, 0.5, 1.33, 0.67, 2.5, 0.4],
            translations,
            enabled: SearchAction::ALL.to_vec(),
        }
    }
}

impl ActionMenu {
    /// A menu with every action class disabled.
    pub fn empty() -> Self {
        Self {
            scales: Vec::new(),
            translations: Vec::new(),
            enabled: Vec::new(),
        }
    }

    pub fn only(actions: &[SearchAction]) -> Self {
        Self {
            enabled: actions.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, action: SearchAction) -> bool {
        self.enabled.contains(&action)
    }

    /// Materialise every move for `model`, in action-class order.
    pub fn moves(&self, model: &ActiveAppearanceModel) -> Vec<Move> {
        let mut out = Vec::new();
        for action in SearchAction::ALL {
            if !self.is_enabled(action) {
                continue;
            }
            match action {
                SearchAction::Scaling => out.extend(self.scales.iter().map(|&f| Move::Scale(f))),
                SearchAction::Translation => {
                    out.extend(self.translations.iter().map(|&v| Move::Translate(v)))
                }
                SearchAction::Reshaping => out.extend(
                    model
                        .shape_model()
                        .perturbation_set()
                        .into_iter()
                        .map(Move::Reshape),
                ),
                SearchAction::Reappearancing => out.extend(
                    model
                        .appearance_model()
                        .perturbation_set()
                        .into_iter()
                        .map(Move::Reappear),
                ),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Move {
    Scale(f64),
    Translate(Vector2<f64>),
    Reshape(DVector<f64>),
    Reappear(DVector<f64>),
}

impl Move {
    pub fn action(&self) -> SearchAction {
        match self {
            Move::Scale(_) => SearchAction::Scaling,
            Move::Translate(_) => SearchAction::Translation,
            Move::Reshape(_) => SearchAction::Reshaping,
            Move::Reappear(_) => SearchAction::Reappearancing,
        }
    }

    /// A new child of `parent`; the parent is left untouched.
    ///
    /// A delta whose length differs from the parent's parameters fails with
    /// `DimensionMismatch`.
    pub fn apply(&self, parent: &FittedModelInstance) -> Result<FittedModelInstance, FitError> {
        Ok(match self {
            Move::Scale(f) => parent.with_scale(parent.scale() * *f),
            Move::Translate(v) => parent.with_origin(parent.origin() + *v),
            Move::Reshape(d) => {
                let shape_param = add_delta("shape parameters", parent.shape_param(), d)?;
                parent.with_shape_param(shape_param)
            }
            Move::Reappear(d) => {
                let app_param = add_delta("appearance parameters", parent.appearance_param(), d)?;
                parent.with_appearance_param(app_param)
            }
        })
    }
}

fn add_delta(
    context: &'static str,
    params: &DVector<f64>,
    delta: &DVector<f64>,
) -> Result<DVector<f64>, FitError> {
    if params.len() != delta.len() {
        return Err(FitError::dimension(context, delta.len(), params.len()));
    }
    Ok(params + delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn default_menus_match_the_fixed_tables() {
        let menu = ActionMenu::default();
        assert_eq!(menu.scales.len(), 8);
        assert_eq!(menu.translations.len(), 12);
        assert_eq!(menu.translations[0], Vector2::new(-5.0, 0.0));
        assert_eq!(menu.translations[1], Vector2::new(0.0, -5.0));
        assert_eq!(menu.translations[11], Vector2::new(0.0, 25.0));
        assert_eq!(menu.enabled, SearchAction::ALL.to_vec());
    }

    #[test]
    fn action_names() {
        let names: Vec<String> = SearchAction::ALL.iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["SCALING", "TRANSLATION", "RESHAPING", "REAPP"]);
    }

    #[test]
    fn moves_touch_one_field_group() {
        let parent = FittedModelInstance::at_mean(2, 2).with_origin(Point2::new(10.0, 10.0));

        let scaled = Move::Scale(1.5).apply(&parent).unwrap();
        assert_eq!(scaled.scale(), 1.5);
        assert_eq!(scaled.origin(), parent.origin());

        let moved = Move::Translate(Vector2::new(-5.0, 0.0)).apply(&parent).unwrap();
        assert_eq!(moved.origin(), Point2::new(5.0, 10.0));
        assert_eq!(moved.scale(), parent.scale());

        let reshaped = Move::Reshape(DVector::from_vec(vec![0.0, 1.0])).apply(&parent).unwrap();
        assert_eq!(reshaped.shape_param().as_slice(), &[0.0, 1.0]);
        assert_eq!(reshaped.appearance_param(), parent.appearance_param());

        let reapp = Move::Reappear(DVector::from_vec(vec![-1.0, 0.0])).apply(&parent).unwrap();
        assert_eq!(reapp.appearance_param().as_slice(), &[-1.0, 0.0]);

        // parent unchanged
        assert_eq!(parent, FittedModelInstance::at_mean(2, 2).with_origin(Point2::new(10.0, 10.0)));
    }

    #[test]
    fn mismatched_delta_is_a_dimension_error() {
        let parent = FittedModelInstance::at_mean(2, 2);
        let err = Move::Reshape(DVector::zeros(3)).apply(&parent).unwrap_err();
        assert_eq!(err, FitError::dimension("shape parameters", 3, 2));
        assert!(!err.is_recoverable());

        let err = Move::Reappear(DVector::zeros(1)).apply(&parent).unwrap_err();
        assert_eq!(err, FitError::dimension("appearance parameters", 1, 2));

        // scale and translation never depend on the parameter lengths
        assert!(Move::Scale(2.0).apply(&parent).is_ok());
    }

    #[test]
    fn move_reports_its_action() {
        assert_eq!(Move::Scale(2.0).action(), SearchAction::Scaling);
        assert_eq!(Move::Reappear(DVector::zeros(1)).action(), SearchAction::Reappearancing);
    }
}
