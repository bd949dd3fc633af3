//! Shared fixtures for integration tests: seeded plans, a scriptable
//! executor, and a repository wrapper that injects transient faults.

#![allow(dead_code)] // not every test binary uses every fixture

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use facility_core::error::{ExposureError, RepositoryError};
use facility_core::executor::ExposureExecutor;
use facility_core::models::{ArtifactRef, NewPlan, Observation, Plan};
use facility_core::repository::{FacilityRepository, MemoryRepository};
use facility_core::state_machine::{ObservationStatus, PlanStatus};

pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Builder for seeding plans directly into a [`MemoryRepository`], including
/// states that `create_plan` cannot produce (stranded `processing` plans,
/// lapsed windows, explicit creation times).
pub struct PlanBuilder {
    plan: Plan,
}

impl PlanBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            plan: Plan {
                id: 0,
                name: unique_name("plan"),
                status: PlanStatus::Pending,
                validity_window_start: now - Duration::hours(1),
                validity_window_end: now + Duration::hours(1),
                instrument_id: 1,
                payload: serde_json::json!({}),
                requested_by: "tester".to_string(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.plan.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: PlanStatus) -> Self {
        self.plan.status = status;
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.plan.validity_window_start = start;
        self.plan.validity_window_end = end;
        self
    }

    /// Window that opened in the past and already closed: selecting this plan
    /// marks it missed.
    pub fn with_lapsed_window(self, now: DateTime<Utc>) -> Self {
        self.with_window(now - Duration::hours(2), now - Duration::hours(1))
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.plan.created_at = created_at;
        self.plan.updated_at = created_at;
        self
    }

    pub fn seed(self, repository: &MemoryRepository) -> i64 {
        repository.seed_plan(self.plan)
    }
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for seeding observations under an already-seeded plan.
pub struct ObservationBuilder {
    observation: Observation,
}

impl ObservationBuilder {
    pub fn new(plan_id: i64) -> Self {
        let now = Utc::now();
        Self {
            observation: Observation {
                id: 0,
                plan_id,
                instrument_id: 1,
                ra: 150.0,
                dec: 2.2,
                filter: "ztfg".to_string(),
                exposure_time: 300.0,
                program_pi: "queue".to_string(),
                priority: 5,
                status: ObservationStatus::Pending,
                completed_at: None,
                artifact_ref: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.observation.id = id;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.observation.priority = priority;
        self
    }

    pub fn with_status(mut self, status: ObservationStatus) -> Self {
        self.observation.status = status;
        self
    }

    pub fn with_coordinates(mut self, ra: f64, dec: f64) -> Self {
        self.observation.ra = ra;
        self.observation.dec = dec;
        self
    }

    pub fn seed(self, repository: &MemoryRepository) -> i64 {
        repository.seed_observation(self.observation)
    }
}

/// A plan submission with `count` observations, usable through `create_plan`.
pub fn new_plan_with_observations(name: &str, count: usize) -> NewPlan {
    let now = Utc::now();
    NewPlan {
        name: name.to_string(),
        instrument_id: 1,
        validity_window_start: now - Duration::hours(1),
        validity_window_end: now + Duration::hours(1),
        payload: serde_json::json!({}),
        requested_by: "tester".to_string(),
        observations: (0..count)
            .map(|i| facility_core::models::NewObservation::at(150.0 + i as f64 * 0.1, 2.2))
            .collect(),
    }
}

/// Scripted response for one exposure attempt.
pub enum ScriptedOutcome {
    Succeed,
    TransientFailure(&'static str),
    PermanentFailure(&'static str),
}

/// [`ExposureExecutor`] that records dispatch order and serves scripted
/// outcomes. Attempts without a script succeed with a synthetic artifact.
#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Mutex<HashMap<i64, VecDeque<ScriptedOutcome>>>,
    dispatched: Mutex<Vec<i64>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next attempt on `observation_id`. Multiple
    /// calls queue outcomes in order; once drained, attempts succeed.
    pub fn script(&self, observation_id: i64, outcome: ScriptedOutcome) {
        self.scripts
            .lock()
            .entry(observation_id)
            .or_default()
            .push_back(outcome);
    }

    /// Observation ids in the order `execute` was called, attempts included.
    pub fn dispatch_order(&self) -> Vec<i64> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl ExposureExecutor for ScriptedExecutor {
    async fn execute(&self, observation: &Observation) -> Result<ArtifactRef, ExposureError> {
        self.dispatched.lock().push(observation.id);

        let outcome = self
            .scripts
            .lock()
            .get_mut(&observation.id)
            .and_then(VecDeque::pop_front);

        match outcome {
            None | Some(ScriptedOutcome::Succeed) => Ok(ArtifactRef::new(format!(
                "scripted/{}.fits",
                observation.id
            ))),
            Some(ScriptedOutcome::TransientFailure(reason)) => {
                Err(ExposureError::unavailable(reason))
            }
            Some(ScriptedOutcome::PermanentFailure(reason)) => Err(ExposureError::failed(reason)),
        }
    }
}

/// Repository wrapper that fails the next N operations with a transient
/// connection error, then delegates to the wrapped store.
pub struct FlakyRepository {
    inner: Arc<MemoryRepository>,
    failures_remaining: AtomicU32,
}

impl FlakyRepository {
    pub fn new(inner: Arc<MemoryRepository>) -> Self {
        Self {
            inner,
            failures_remaining: AtomicU32::new(0),
        }
    }

    /// Arm the wrapper: the next `count` repository calls fail.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::connection_failed("injected fault"));
        }
        Ok(())
    }
}

#[async_trait]
impl FacilityRepository for FlakyRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.ping().await
    }

    async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, RepositoryError> {
        self.check()?;
        self.inner.create_plan(new_plan).await
    }

    async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>, RepositoryError> {
        self.check()?;
        self.inner.find_plan(plan_id).await
    }

    async fn find_eligible_plans(&self, now: DateTime<Utc>) -> Result<Vec<Plan>, RepositoryError> {
        self.check()?;
        self.inner.find_eligible_plans(now).await
    }

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.update_plan_status(plan_id, status).await
    }

    async fn find_observation(
        &self,
        observation_id: i64,
    ) -> Result<Option<Observation>, RepositoryError> {
        self.check()?;
        self.inner.find_observation(observation_id).await
    }

    async fn find_runnable_observations(
        &self,
        plan_id: i64,
    ) -> Result<Vec<Observation>, RepositoryError> {
        self.check()?;
        self.inner.find_runnable_observations(plan_id).await
    }

    async fn update_observation_status(
        &self,
        observation_id: i64,
        status: ObservationStatus,
        artifact_ref: Option<&ArtifactRef>,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner
            .update_observation_status(observation_id, status, artifact_ref)
            .await
    }
}
