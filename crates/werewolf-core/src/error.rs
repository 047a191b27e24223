//! Domain error types.

use thiserror::Error;

/// Top-level error returned by every fallible game operation.
///
/// Only [`GameError::InvariantViolation`] ends a game; everything else is
/// reported back to the caller and leaves state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Command issued from the wrong place or by someone without standing.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation not valid in the current lifecycle state.
    #[error("state error: {0}")]
    State(String),

    /// A numeric constraint was violated.
    #[error("capacity error: {0}")]
    Capacity(String),

    /// An internal consistency check failed after an operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A collaborator (membership source, lock) failed.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl GameError {
    /// Machine-readable error code, stable across releases.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::State(_) => "state_error",
            Self::Capacity(_) => "capacity_error",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }

    /// Whether this error must tear down the game it occurred in.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invariant_violation_is_fatal() {
        assert!(GameError::InvariantViolation("x".into()).is_fatal());
        assert!(!GameError::State("x".into()).is_fatal());
        assert!(!GameError::Capacity("x".into()).is_fatal());
        assert!(!GameError::Validation("x".into()).is_fatal());
        assert!(!GameError::Infrastructure("x".into()).is_fatal());
    }

    #[test]
    fn test_display_includes_category_prefix() {
        let err = GameError::Capacity("need at least 5 players".into());

        assert_eq!(err.to_string(), "capacity error: need at least 5 players");
        assert_eq!(err.code(), "capacity_error");
    }
}
