//! # Error Types
//!
//! Structured error handling for the facility core using thiserror, with an
//! explicit transient/permanent classification consumed by the queue loop.
//!
//! The orchestration loop never propagates errors past itself: transient
//! errors trigger a fixed backoff and a retry of the whole cycle, permanent
//! errors are absorbed where they occur (drop the work-list entry, release
//! in-memory ownership). `FacilityError::is_transient` is the single
//! predicate that decides which path an error takes.

use thiserror::Error;

pub use crate::state_machine::StateTransitionError;

/// Errors surfaced by a [`FacilityRepository`](crate::repository::FacilityRepository)
/// implementation.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("repository connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("repository query failed: {operation}: {message}")]
    QueryFailed { operation: String, message: String },

    #[error("repository operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("plan not found: {plan_id}")]
    PlanNotFound { plan_id: i64 },

    #[error("observation not found: {observation_id}")]
    ObservationNotFound { observation_id: i64 },

    #[error("a plan named {name:?} already exists")]
    DuplicatePlanName { name: String },

    #[error("invalid plan: {message}")]
    InvalidPlan { message: String },
}

impl RepositoryError {
    /// Create a connection error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a query error tagged with the failing operation.
    pub fn query_failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for a rejected plan submission.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }

    /// Whether retrying the operation may succeed. Lookups that came back
    /// empty and constraint violations cannot heal on their own; everything
    /// touching the connection can.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::QueryFailed { .. } | Self::Timeout { .. }
        )
    }
}

/// Errors surfaced by an [`ExposureExecutor`](crate::executor::ExposureExecutor).
///
/// The two variants land on different paths: `Failed` is a terminal business
/// outcome recorded as the observation's `failed` status, `Unavailable` is a
/// transient infrastructure condition that leaves the observation
/// `processing` for a later re-attempt.
#[derive(Error, Debug)]
pub enum ExposureError {
    #[error("exposure failed: {reason}")]
    Failed { reason: String },

    #[error("facility unavailable: {reason}")]
    Unavailable { reason: String },
}

impl ExposureError {
    /// Create a terminal exposure failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Create a transient facility-unreachable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether the exposure should be re-attempted rather than recorded as
    /// failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {message}")]
    Load { message: String },

    #[error("invalid configuration value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Umbrella error for the facility core.
#[derive(Error, Debug)]
pub enum FacilityError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Exposure(#[from] ExposureError),

    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl FacilityError {
    /// Classification consumed by the queue loop: transient errors take the
    /// backoff-and-retry path, everything else is absorbed in place.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Repository(e) => e.is_transient(),
            Self::Exposure(e) => e.is_transient(),
            Self::StateTransition(_) | Self::Configuration(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FacilityError>;
