use thiserror::Error;

/// Errors raised when a status/event pair has no defined transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    #[error("Invalid plan transition from '{from}' on event '{event}'")]
    InvalidPlanTransition { from: String, event: String },

    #[error("Invalid observation transition from '{from}' on event '{event}'")]
    InvalidObservationTransition { from: String, event: String },
}

impl StateTransitionError {
    pub fn invalid_plan(from: impl ToString, event: impl ToString) -> Self {
        Self::InvalidPlanTransition {
            from: from.to_string(),
            event: event.to_string(),
        }
    }

    pub fn invalid_observation(from: impl ToString, event: impl ToString) -> Self {
        Self::InvalidObservationTransition {
            from: from.to_string(),
            event: event.to_string(),
        }
    }
}

/// Result type for transition computations
pub type StateTransitionResult<T> = Result<T, StateTransitionError>;
