//! Bounded beam search over model instances.
//!
//! One run:
//!
//! - place the seed at `init_pos` / `init_scale` and score it
//! - expand every frontier member with every move (fixed action order)
//! - score all children (parallel, collected in index order)
//! - move the best `num_models_to_generate_per_iter` children into the
//!   frontier, then truncate it to `max_tree_size`
//! - stop on zero error, on relative improvement `<= min_error`, or when the
//!   iteration budget is spent
//!
//! Nothing here is random: identical inputs always give identical outcomes.

use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{FittedModelInstance, FittingCriteria, Sample};
use crate::error::FitError;
use crate::fit::{ActionMenu, BoundedPriorityList, Move};
use crate::models::ActiveAppearanceModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The best candidate matches the sample exactly.
    ZeroError,
    /// Relative improvement fell to `min_error` or below.
    Converged,
    /// `num_max_iter` iterations were run.
    Exhausted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::ZeroError => "zero error",
            Termination::Converged => "converged",
            Termination::Exhausted => "iteration budget exhausted",
        };
        f.write_str(s)
    }
}

/// Result of [`ModelFitter::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub model: FittedModelInstance,
    pub error: f64,
    /// Completed expansion rounds (0 when the seed already matched).
    pub iterations: usize,
    pub termination: Termination,
    /// Best error after each iteration; index 0 is the seed.
    pub history: Vec<f64>,
    /// Size of the frontier when the run stopped.
    pub frontier_size: usize,
}

impl fmt::Display for FitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit outcome:")?;
        writeln!(f, "...termination       = {}", self.termination)?;
        writeln!(f, "...iterations        = {}", self.iterations)?;
        writeln!(f, "...best error        = {:.6}", self.error)?;
        writeln!(f, "...frontier size     = {}", self.frontier_size)?;
        write!(f, "{}", self.model)
    }
}

pub struct ModelFitter<'a> {
    model: &'a ActiveAppearanceModel,
    sample: &'a Sample,
    criteria: FittingCriteria,
    menu: ActionMenu,
    moves: Vec<Move>,
}

impl<'a> ModelFitter<'a> {
    pub fn new(
        model: &'a ActiveAppearanceModel,
        sample: &'a Sample,
        criteria: FittingCriteria,
    ) -> Result<Self, FitError> {
        criteria.validate()?;
        if sample.landmarks.len() != model.num_landmarks() {
            return Err(FitError::dimension(
                "sample landmarks",
                model.num_landmarks(),
                sample.landmarks.len(),
            ));
        }
        let menu = ActionMenu::default();
        let moves = menu.moves(model);
        Ok(Self {
            model,
            sample,
            criteria,
            menu,
            moves,
        })
    }

    pub fn with_menu(mut self, menu: ActionMenu) -> Self {
        self.moves = menu.moves(self.model);
        self.menu = menu;
        self
    }

    pub fn criteria(&self) -> &FittingCriteria {
        &self.criteria
    }

    pub fn menu(&self) -> &ActionMenu {
        &self.menu
    }

    /// Every move applied during one expansion of a single parent.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Children of `parent`, one per move, in move order.
    ///
    /// A parent whose parameter lengths do not match the model fails with
    /// `DimensionMismatch`.
    pub fn expand(
        &self,
        parent: &FittedModelInstance,
    ) -> Result<Vec<FittedModelInstance>, FitError> {
        self.moves.iter().map(|m| m.apply(parent)).collect()
    }

    /// Run the search from `init`. `None` fails with `InvalidInitialModel`.
    pub fn fit(&self, init: Option<&FittedModelInstance>) -> Result<FitOutcome, FitError> {
        let init = init.ok_or(FitError::InvalidInitialModel)?;
        let crit = &self.criteria;

        let seed = init
            .with_origin(crit.init_pos)
            .with_scale(crit.init_scale);
        let seed_error = self.model.measure_error(&seed, self.sample)?;

        info!(
            "fit: seed error {:.6}, {} moves per parent, budget {} iteration(s)",
            seed_error,
            self.moves.len(),
            crit.num_max_iter
        );

        let mut frontier = BoundedPriorityList::new(crit.max_tree_size);
        frontier.push(seed, seed_error);
        let mut history = vec![seed_error];

        if seed_error == 0.0 {
            return finish(frontier, 0, Termination::ZeroError, history);
        }

        let mut prev_best = seed_error;
        for iteration in 1..=crit.num_max_iter {
            let buffer = self.expand_frontier(&frontier, iteration)?;

            let generated = buffer.len();
            let mut transfer = buffer;
            transfer.take(crit.num_models_to_generate_per_iter);
            frontier.merge(transfer);
            frontier.dedup();
            frontier.shrink_to_capacity();

            let best = frontier.best().map(|(_, s)| s).unwrap_or(prev_best);
            history.push(best);
            debug!(
                "iter {iteration}: {generated} scored, frontier {}, best {best:.6}",
                frontier.len()
            );

            if best == 0.0 {
                return finish(frontier, iteration, Termination::ZeroError, history);
            }
            let rel = if prev_best > 0.0 {
                (prev_best - best) / prev_best
            } else {
                0.0
            };
            if rel <= crit.min_error {
                return finish(frontier, iteration, Termination::Converged, history);
            }
            prev_best = best;
        }

        finish(frontier, crit.num_max_iter, Termination::Exhausted, history)
    }

    /// Score every child of every frontier member into a fresh buffer.
    fn expand_frontier(
        &self,
        frontier: &BoundedPriorityList<FittedModelInstance>,
        iteration: usize,
    ) -> Result<BoundedPriorityList<FittedModelInstance>, FitError> {
        let mut children = Vec::with_capacity(frontier.len() * self.moves.len());
        for (_, parent) in frontier.iter() {
            children.extend(self.expand(parent)?);
        }

        let scores: Vec<Result<f64, FitError>> = if self.criteria.parallel {
            children
                .par_iter()
                .map(|c| self.model.measure_error(c, self.sample))
                .collect()
        } else {
            children
                .iter()
                .map(|c| self.model.measure_error(c, self.sample))
                .collect()
        };

        let mut buffer = BoundedPriorityList::new(self.criteria.num_models_to_generate_per_iter);
        let mut discarded = 0usize;
        for (child, score) in children.into_iter().zip(scores) {
            match score {
                Ok(s) => buffer.push(child, s),
                Err(e) if e.is_recoverable() => discarded += 1,
                Err(e) => return Err(e),
            }
        }

        if discarded > 0 {
            warn!("iter {iteration}: discarded {discarded} candidate(s) that could not be scored");
        }
        if buffer.is_empty() {
            return Err(FitError::NoCandidatesGenerated { iteration });
        }
        Ok(buffer)
    }
}

fn finish(
    frontier: BoundedPriorityList<FittedModelInstance>,
    iterations: usize,
    termination: Termination,
    history: Vec<f64>,
) -> Result<FitOutcome, FitError> {
    let frontier_size = frontier.len();
    let Some((model, error)) = frontier.into_best() else {
        return Err(FitError::NoCandidatesGenerated {
            iteration: iterations,
        });
    };
    info!("fit: {termination} after {iterations} iteration(s), error {error:.6}");
    Ok(FitOutcome {
        model,
        error,
        iterations,
        termination,
        history,
        frontier_size,
    })
}
