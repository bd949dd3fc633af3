//! In-memory repository
//!
//! A complete [`FacilityRepository`] over process-local maps. This is what
//! unit and integration tests run against; it also serves manual experiments
//! that should not need a database.

use super::FacilityRepository;
use crate::error::RepositoryError;
use crate::models::{ArtifactRef, NewPlan, Observation, Plan};
use crate::state_machine::{ObservationStatus, PlanStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct Inner {
    plans: BTreeMap<i64, Plan>,
    observations: BTreeMap<i64, Observation>,
    next_plan_id: i64,
    next_observation_id: i64,
}

impl Inner {
    fn next_plan_id(&mut self) -> i64 {
        self.next_plan_id += 1;
        self.next_plan_id
    }

    fn next_observation_id(&mut self) -> i64 {
        self.next_observation_id += 1;
        self.next_observation_id
    }
}

/// Process-local store. Cloning is intentionally not provided; share it
/// through `Arc` like any other repository.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed plan, keeping its id when one is set. Tests use
    /// this to seed histories that cannot arise through `create_plan` alone,
    /// like plans stranded in `processing` by an interrupted run.
    pub fn seed_plan(&self, mut plan: Plan) -> i64 {
        let mut inner = self.inner.lock();
        if plan.id <= 0 {
            plan.id = inner.next_plan_id();
        } else {
            inner.next_plan_id = inner.next_plan_id.max(plan.id);
        }
        let id = plan.id;
        inner.plans.insert(id, plan);
        id
    }

    /// Insert a fully-formed observation, keeping its id when one is set.
    pub fn seed_observation(&self, mut observation: Observation) -> i64 {
        let mut inner = self.inner.lock();
        if observation.id <= 0 {
            observation.id = inner.next_observation_id();
        } else {
            inner.next_observation_id = inner.next_observation_id.max(observation.id);
        }
        let id = observation.id;
        inner.observations.insert(id, observation);
        id
    }

    /// Delete a plan out from under the service, as an external API call
    /// would. Its observations are removed with it.
    pub fn remove_plan(&self, plan_id: i64) -> Option<Plan> {
        let mut inner = self.inner.lock();
        let removed = inner.plans.remove(&plan_id);
        if removed.is_some() {
            inner.observations.retain(|_, o| o.plan_id != plan_id);
        }
        removed
    }

    /// Delete a single observation out from under the service.
    pub fn remove_observation(&self, observation_id: i64) -> Option<Observation> {
        self.inner.lock().observations.remove(&observation_id)
    }

    /// Snapshot of a plan without going through the async trait.
    pub fn plan(&self, plan_id: i64) -> Option<Plan> {
        self.inner.lock().plans.get(&plan_id).cloned()
    }

    /// Snapshot of every observation belonging to a plan, ascending id.
    pub fn observations_for_plan(&self, plan_id: i64) -> Vec<Observation> {
        self.inner
            .lock()
            .observations
            .values()
            .filter(|o| o.plan_id == plan_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FacilityRepository for MemoryRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_plan(&self, new_plan: NewPlan) -> Result<Plan, RepositoryError> {
        new_plan
            .validate()
            .map_err(RepositoryError::invalid_plan)?;

        let now = Utc::now();
        let mut inner = self.inner.lock();

        if inner.plans.values().any(|p| p.name == new_plan.name) {
            return Err(RepositoryError::DuplicatePlanName {
                name: new_plan.name,
            });
        }

        let plan_id = inner.next_plan_id();
        let plan = Plan {
            id: plan_id,
            name: new_plan.name,
            status: PlanStatus::Pending,
            validity_window_start: new_plan.validity_window_start,
            validity_window_end: new_plan.validity_window_end,
            instrument_id: new_plan.instrument_id,
            payload: new_plan.payload,
            requested_by: new_plan.requested_by,
            created_at: now,
            updated_at: now,
        };
        inner.plans.insert(plan_id, plan.clone());

        for new_observation in new_plan.observations {
            let observation_id = inner.next_observation_id();
            inner.observations.insert(
                observation_id,
                Observation {
                    id: observation_id,
                    plan_id,
                    instrument_id: plan.instrument_id,
                    ra: new_observation.ra,
                    dec: new_observation.dec,
                    filter: new_observation.filter,
                    exposure_time: new_observation.exposure_time,
                    program_pi: new_observation.program_pi,
                    priority: new_observation.priority,
                    status: ObservationStatus::Pending,
                    completed_at: None,
                    artifact_ref: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Ok(plan)
    }

    async fn find_plan(&self, plan_id: i64) -> Result<Option<Plan>, RepositoryError> {
        Ok(self.inner.lock().plans.get(&plan_id).cloned())
    }

    async fn find_eligible_plans(&self, now: DateTime<Utc>) -> Result<Vec<Plan>, RepositoryError> {
        let inner = self.inner.lock();
        let mut eligible: Vec<Plan> = inner
            .plans
            .values()
            .filter(|p| p.status.is_selectable() && p.window_open_at(now))
            .cloned()
            .collect();
        eligible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(eligible)
    }

    async fn update_plan_status(
        &self,
        plan_id: i64,
        status: PlanStatus,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        let plan = inner
            .plans
            .get_mut(&plan_id)
            .ok_or(RepositoryError::PlanNotFound { plan_id })?;
        plan.status = status;
        plan.updated_at = Utc::now();
        Ok(())
    }

    async fn find_observation(
        &self,
        observation_id: i64,
    ) -> Result<Option<Observation>, RepositoryError> {
        Ok(self.inner.lock().observations.get(&observation_id).cloned())
    }

    async fn find_runnable_observations(
        &self,
        plan_id: i64,
    ) -> Result<Vec<Observation>, RepositoryError> {
        // BTreeMap iteration yields ascending ids
        Ok(self
            .inner
            .lock()
            .observations
            .values()
            .filter(|o| o.plan_id == plan_id && o.is_runnable())
            .cloned()
            .collect())
    }

    async fn update_observation_status(
        &self,
        observation_id: i64,
        status: ObservationStatus,
        artifact_ref: Option<&ArtifactRef>,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        let observation =
            inner
                .observations
                .get_mut(&observation_id)
                .ok_or(RepositoryError::ObservationNotFound { observation_id })?;
        observation.status = status;
        if status == ObservationStatus::Done {
            observation.completed_at = Some(Utc::now());
            observation.artifact_ref = artifact_ref.cloned();
        }
        observation.updated_at = Utc::now();
        Ok(())
    }
}
