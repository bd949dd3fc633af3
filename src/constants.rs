//! # System Constants
//!
//! Core constants and status groupings that define the operational
//! boundaries of the facility queue service.

// Re-export status types for convenience
pub use crate::state_machine::{ObservationStatus, PlanStatus};

/// System-wide defaults (overridable through [`FacilityConfig`](crate::config::FacilityConfig))
pub mod system {
    /// Seconds the loop waits when no eligible plan exists.
    pub const DEFAULT_IDLE_BACKOFF_SECONDS: u64 = 15;

    /// Seconds the loop waits after a transient error before retrying.
    pub const DEFAULT_ERROR_BACKOFF_SECONDS: u64 = 5;

    /// Simulated exposure duration used by the stub executor.
    pub const DEFAULT_EXPOSURE_DELAY_SECONDS: u64 = 10;

    /// Directory the stub executor writes placeholder artifacts into.
    pub const DEFAULT_ARTIFACT_DIRECTORY: &str = "observations_data";

    /// Repository readiness probes attempted before the service gives up.
    pub const DEFAULT_STARTUP_PROBE_ATTEMPTS: u32 = 10;

    /// Seconds between repository readiness probes.
    pub const DEFAULT_STARTUP_PROBE_DELAY_SECONDS: u64 = 1;

    /// Lowest observation priority; 1 is the highest.
    pub const DEFAULT_OBSERVATION_PRIORITY: i32 = 5;
}

/// Status groupings used by selection and work-list queries
pub mod status_groups {
    use super::{ObservationStatus, PlanStatus};

    /// Plan statuses eligible for (re-)selection. `Processing` is included so
    /// a plan stranded by a crashed run is picked up again.
    pub const SELECTABLE_PLAN_STATUSES: &[PlanStatus] =
        &[PlanStatus::Pending, PlanStatus::Processing];

    /// Plan statuses from which no further transition occurs.
    pub const TERMINAL_PLAN_STATUSES: &[PlanStatus] =
        &[PlanStatus::Done, PlanStatus::Missed, PlanStatus::Failed];

    /// Observation statuses eligible for (re-)dispatch.
    pub const RUNNABLE_OBSERVATION_STATUSES: &[ObservationStatus] = &[
        ObservationStatus::Pending,
        ObservationStatus::Processing,
    ];

    /// Observation statuses from which no further transition occurs.
    pub const TERMINAL_OBSERVATION_STATUSES: &[ObservationStatus] =
        &[ObservationStatus::Done, ObservationStatus::Failed];
}
