//! Repository abstraction over the plan/observation store
//!
//! The queue loop only ever talks to [`FacilityRepository`], so the Postgres
//! backend can be swapped for the in-memory one in tests (or for a different
//! store entirely) without touching orchestration code.
//!
//! Implementations persist statuses as they are told; transition legality is
//! the state machines' concern and is checked before an update is issued.

use crate::error::RepositoryError;
use crate::models::{ArtifactRef, NewPlan, Observation, Plan};
use crate::state_machine::{ObservationStatus, PlanStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryRepository;
#[cfg(feature = "postgres")]
pub use postgres::PgRepository;

/// Store operations the queue service depends on.
#[async_trait]
pub trait FacilityRepository: Send + Sync {
    /// Cheap liveness check used by the startup probe.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Atomically create a plan together with its observations. Fails with
    /// [`RepositoryError::DuplicatePlanName`] when the name is taken; nothing
    /// is persisted in that case.
    async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, RepositoryError>;

    async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>, RepositoryError>;

    /// Plans whose status still allows selection and whose validity window
    /// has opened by `now`, oldest submission first. Window lapse is NOT
    /// filtered here; the selector decides between running and missing each
    /// candidate.
    async fn find_eligible_plans(&self, now: DateTime<Utc>) -> Result<Vec<Plan>, RepositoryError>;

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
    ) -> Result<(), RepositoryError>;

    async fn find_observation(
        &self,
        observation_id: i64,
    ) -> Result<Option<Observation>, RepositoryError>;

    /// Observations of the plan still awaiting dispatch (pending or stranded
    /// in processing), in ascending id order.
    async fn find_runnable_observations(
        &self,
        plan_id: i64,
    ) -> Result<Vec<Observation>, RepositoryError>;

    /// Persist an observation status. A transition to `Done` also records
    /// the artifact reference and stamps `completed_at`.
    async fn update_observation_status(
        &self,
        observation_id: i64,
        status: ObservationStatus,
        artifact_ref: Option<&ArtifactRef>,
    ) -> Result<(), RepositoryError>;
}

/// Block until the repository answers a ping, retrying `attempts` times with
/// `delay` between probes. The queue service calls this before entering its
/// loop so a store that is still starting up does not burn the error backoff.
pub async fn wait_until_ready(
    repository: &dyn FacilityRepository,
    attempts: u32,
    delay: Duration,
) -> Result<(), RepositoryError> {
    let mut last_error = RepositoryError::connection_failed("no probe attempted");

    for attempt in 1..=attempts {
        match repository.ping().await {
            Ok(()) => {
                info!(attempt = attempt, "Repository is ready");
                return Ok(());
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    attempts = attempts,
                    error = %e,
                    "Repository not ready yet"
                );
                last_error = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRepository;

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_succeeds_against_memory_store() {
        let repository = MemoryRepository::new();
        wait_until_ready(&repository, 3, Duration::from_secs(1))
            .await
            .unwrap();
    }
}
