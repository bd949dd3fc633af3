//! # Plan Selector
//!
//! Decides which plan the queue service works on next and retires the plan it
//! just finished. Selection looks at one candidate per pass: the oldest plan
//! whose window has opened. A candidate whose window already lapsed is marked
//! missed and nothing else is considered until the next cycle re-queries, so
//! a burst of stale plans drains one per idle backoff instead of starving the
//! loop.
//!
//! Plans left `processing` by an interrupted run stay in the candidate set
//! and are re-claimed through the `processing` -> `processing` transition.

use crate::error::Result;
use crate::logging::log_plan_operation;
use crate::orchestration::queue_service::QueueState;
use crate::orchestration::work_list::WorkEntry;
use crate::repository::FacilityRepository;
use crate::state_machine::{plan_machine, PlanEvent};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a selection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// A plan was claimed; the caller loads its work list next
    Selected { plan_id: i64 },
    /// The oldest candidate had already lapsed and was marked missed; the
    /// caller backs off and re-queries next cycle
    Missed { plan_id: i64 },
    /// No candidate exists
    Idle,
}

pub struct PlanSelector {
    repository: Arc<dyn FacilityRepository>,
}

impl PlanSelector {
    pub fn new(repository: Arc<dyn FacilityRepository>) -> Self {
        Self { repository }
    }

    /// Retire the owned plan once its work list has drained.
    ///
    /// The work list only empties through completed dispatch, so a `true`
    /// return means every observation dispatched under this run reached a
    /// terminal status before the plan was marked done.
    #[instrument(skip_all)]
    pub async fn retire_if_drained(&self, state: &mut QueueState) -> Result<bool> {
        let Some(plan_id) = state.current_plan else {
            return Ok(false);
        };
        if !state.work_list.is_empty() {
            return Ok(false);
        }

        let Some(plan) = self.repository.find_plan(plan_id).await? else {
            warn!(plan_id, "Owned plan disappeared from the store, releasing ownership");
            state.current_plan = None;
            return Ok(false);
        };

        match plan_machine::determine_target_status(plan.status, &PlanEvent::Complete) {
            Ok(target) => {
                self.repository.update_plan_status(plan_id, target).await?;
                state.current_plan = None;
                info!(plan_id, name = %plan.name, "Plan drained and retired");
                log_plan_operation("retire", Some(plan_id), Some(&plan.name), "done", None);
                Ok(true)
            }
            Err(e) => {
                // finalized externally while we held it
                warn!(
                    plan_id,
                    status = %plan.status,
                    error = %e,
                    "Owned plan can no longer complete, releasing ownership"
                );
                state.current_plan = None;
                Ok(false)
            }
        }
    }

    /// Pick the next plan to own. Call only while no plan is owned.
    #[instrument(skip_all, fields(now = %now))]
    pub async fn select_next(
        &self,
        state: &mut QueueState,
        now: DateTime<Utc>,
    ) -> Result<SelectionOutcome> {
        let candidates = self.repository.find_eligible_plans(now).await?;
        let Some(plan) = candidates.into_iter().next() else {
            debug!("No eligible plan");
            return Ok(SelectionOutcome::Idle);
        };

        if plan.window_lapsed_at(now) {
            let target = plan_machine::determine_target_status(plan.status, &PlanEvent::Miss)?;
            self.repository.update_plan_status(plan.id, target).await?;
            info!(
                plan_id = plan.id,
                name = %plan.name,
                window_end = %plan.validity_window_end,
                "Validity window lapsed, plan missed"
            );
            log_plan_operation(
                "select",
                Some(plan.id),
                Some(&plan.name),
                "missed",
                Some("validity window lapsed"),
            );
            return Ok(SelectionOutcome::Missed { plan_id: plan.id });
        }

        let target = plan_machine::determine_target_status(plan.status, &PlanEvent::Start)?;
        self.repository.update_plan_status(plan.id, target).await?;
        state.current_plan = Some(plan.id);
        info!(plan_id = plan.id, name = %plan.name, "Plan selected");
        log_plan_operation("select", Some(plan.id), Some(&plan.name), "processing", None);

        Ok(SelectionOutcome::Selected { plan_id: plan.id })
    }

    /// Load the owned plan's runnable observations into the work list and
    /// return how many were loaded.
    ///
    /// Observations already terminal from a prior partial run are excluded,
    /// which is what makes re-selection after a crash idempotent: only the
    /// unfinished exposures run again. Zero loaded is valid; the next cycle
    /// retires the plan.
    #[instrument(skip_all)]
    pub async fn load_work_list(&self, state: &mut QueueState) -> Result<usize> {
        let Some(plan_id) = state.current_plan else {
            return Ok(0);
        };

        let observations = self.repository.find_runnable_observations(plan_id).await?;

        state.work_list.clear();
        for observation in &observations {
            state.work_list.push(WorkEntry {
                observation_id: observation.id,
                priority: observation.priority,
            });
        }

        debug!(plan_id, loaded = observations.len(), "Work list loaded");
        Ok(observations.len())
    }
}
