//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`]: typed library failures (model construction, dimension checks,
//!   search termination, per-candidate scoring failures)
//! - [`AppError`]: what the binary reports (exit code + message)

use thiserror::Error;

/// Failures raised while building models or running a fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Invalid initial model: no seed instance was supplied.")]
    InvalidInitialModel,

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}.")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No candidates generated at iteration {iteration}.")]
    NoCandidatesGenerated { iteration: usize },

    #[error("Model construction failed: {0}")]
    ModelConstructionFailed(String),

    #[error("Invalid fitting criteria: {0}")]
    InvalidCriteria(String),

    #[error(
        "Candidate texture at ({x}, {y}) size {width}x{height} falls outside the {image_width}x{image_height} sample."
    )]
    CandidateOutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
        image_width: usize,
        image_height: usize,
    },

    #[error("Candidate error is not finite.")]
    NonFiniteError,
}

impl FitError {
    pub fn dimension(context: &'static str, expected: usize, actual: usize) -> Self {
        FitError::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Whether the failure only affects a single candidate.
    ///
    /// The fitter drops such candidates from the buffer and keeps searching;
    /// anything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FitError::CandidateOutOfBounds { .. } | FitError::NonFiniteError
        )
    }

    /// Exit code used when the failure reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidCriteria(_) | FitError::DimensionMismatch { .. } => 2,
            FitError::InvalidInitialModel => 3,
            FitError::NoCandidatesGenerated { .. }
            | FitError::ModelConstructionFailed(_)
            | FitError::CandidateOutOfBounds { .. }
            | FitError::NonFiniteError => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_scoring_failures_are_recoverable() {
        assert!(FitError::NonFiniteError.is_recoverable());
        assert!(
            FitError::CandidateOutOfBounds {
                x: -1,
                y: 0,
                width: 2,
                height: 2,
                image_width: 4,
                image_height: 4,
            }
            .is_recoverable()
        );
        assert!(!FitError::InvalidInitialModel.is_recoverable());
        assert!(!FitError::dimension("encode", 4, 3).is_recoverable());
        assert!(!FitError::NoCandidatesGenerated { iteration: 0 }.is_recoverable());
    }

    #[test]
    fn app_error_keeps_fit_error_message_and_code() {
        let app: AppError = FitError::dimension("decode", 3, 2).into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("expected 3, got 2"));
    }
}
