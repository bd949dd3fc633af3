//! # Queue Service
//!
//! The long-running loop that owns the facility: select a plan, dispatch its
//! observations one at a time through the exposure executor, retire the plan
//! once its work list drains. At most one plan is owned at any time and no
//! two observations are ever in flight together.
//!
//! ## Failure policy
//!
//! Nothing escapes [`QueueService::run`]. A transient error leaves all
//! in-memory state where it was, backs off, and retries the cycle, so the
//! front work-list entry is dispatched again. Permanent conditions are
//! absorbed where they occur: a terminal exposure failure becomes the
//! observation's `failed` status, an undispatchable entry is dropped, a plan
//! that can no longer complete releases ownership. Every status is committed
//! before in-memory state advances, so an interrupted run resumes cleanly
//! from the store.

use crate::config::FacilityConfig;
use crate::constants::system;
use crate::error::{FacilityError, Result};
use crate::executor::ExposureExecutor;
use crate::logging::log_observation_operation;
use crate::orchestration::plan_selector::{PlanSelector, SelectionOutcome};
use crate::orchestration::work_list::WorkList;
use crate::repository::FacilityRepository;
use crate::state_machine::{observation_machine, ObservationEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Pacing and ordering knobs for the loop.
#[derive(Debug, Clone)]
pub struct QueueServiceConfig {
    /// Sleep when no eligible plan exists
    pub idle_backoff: Duration,
    /// Sleep after a failed cycle
    pub error_backoff: Duration,
    /// Dispatch by observation priority instead of insertion order
    pub priority_ordering: bool,
}

impl Default for QueueServiceConfig {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_secs(system::DEFAULT_IDLE_BACKOFF_SECONDS),
            error_backoff: Duration::from_secs(system::DEFAULT_ERROR_BACKOFF_SECONDS),
            priority_ordering: false,
        }
    }
}

impl From<&FacilityConfig> for QueueServiceConfig {
    fn from(config: &FacilityConfig) -> Self {
        Self {
            idle_backoff: config.queue.idle_backoff(),
            error_backoff: config.queue.error_backoff(),
            priority_ordering: config.queue.priority_ordering,
        }
    }
}

/// Counters over everything the loop has done since startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub cycles: u64,
    pub plans_started: u64,
    pub plans_retired: u64,
    pub plans_missed: u64,
    pub observations_succeeded: u64,
    pub observations_failed: u64,
    pub entries_skipped: u64,
    pub transient_errors: u64,
}

/// In-memory loop state: the owned plan and what remains to dispatch for it.
#[derive(Debug)]
pub struct QueueState {
    pub(crate) current_plan: Option<i64>,
    pub(crate) work_list: WorkList,
}

impl QueueState {
    pub fn new(priority_ordering: bool) -> Self {
        Self {
            current_plan: None,
            work_list: WorkList::new(priority_ordering),
        }
    }

    pub fn current_plan(&self) -> Option<i64> {
        self.current_plan
    }

    /// Entries still awaiting dispatch for the owned plan.
    pub fn pending_dispatches(&self) -> usize {
        self.work_list.len()
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The front observation reached its terminal commit (done or failed)
    Dispatched { observation_id: i64 },
    /// The front entry was dropped without dispatch (vanished from the store
    /// or already terminal)
    Skipped { observation_id: i64 },
    /// Plan owned but nothing to dispatch; the next cycle retires it
    Drained,
    /// No plan available; sleep before re-querying
    Idle { backoff: Duration },
}

pub struct QueueService {
    service_id: String,
    repository: Arc<dyn FacilityRepository>,
    executor: Arc<dyn ExposureExecutor>,
    selector: PlanSelector,
    state: QueueState,
    config: QueueServiceConfig,
    stats: QueueStats,
}

impl QueueService {
    pub fn new(
        repository: Arc<dyn FacilityRepository>,
        executor: Arc<dyn ExposureExecutor>,
        config: QueueServiceConfig,
    ) -> Self {
        let service_id = format!("facility-queue-{}", Uuid::new_v4());
        let selector = PlanSelector::new(Arc::clone(&repository));
        let state = QueueState::new(config.priority_ordering);
        Self {
            service_id,
            repository,
            executor,
            selector,
            state,
            config,
            stats: QueueStats::default(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// Run the loop until the process is terminated.
    pub async fn run(mut self) {
        info!(
            service_id = %self.service_id,
            idle_backoff = ?self.config.idle_backoff,
            error_backoff = ?self.config.error_backoff,
            priority_ordering = self.config.priority_ordering,
            "🚀 Queue service starting"
        );

        loop {
            match self.cycle(Utc::now()).await {
                Ok(CycleOutcome::Idle { backoff }) => {
                    debug!(backoff = ?backoff, "No work available, sleeping");
                    tokio::time::sleep(backoff).await;
                }
                Ok(_) => {
                    // proceed immediately to the next cycle
                }
                Err(e) => {
                    if e.is_transient() {
                        self.stats.transient_errors += 1;
                        warn!(
                            error = %e,
                            backoff = ?self.config.error_backoff,
                            "Transient failure, backing off before retrying the cycle"
                        );
                    } else {
                        error!(error = %e, "Permanent failure in queue cycle");
                    }
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }
    }

    /// Advance the loop by exactly one iteration. [`run`](Self::run) wraps
    /// this; tests drive it directly with a controlled clock.
    #[instrument(skip(self), fields(service_id = %self.service_id))]
    pub async fn cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        self.stats.cycles += 1;

        // 1. retire a drained plan
        if self.selector.retire_if_drained(&mut self.state).await? {
            self.stats.plans_retired += 1;
        }

        // 2. make sure a plan is owned
        let plan_id = match self.state.current_plan {
            Some(plan_id) => plan_id,
            None => match self.selector.select_next(&mut self.state, now).await? {
                SelectionOutcome::Selected { plan_id } => {
                    match self.selector.load_work_list(&mut self.state).await {
                        Ok(loaded) => {
                            self.stats.plans_started += 1;
                            info!(plan_id, loaded, "Plan loaded for dispatch");
                            plan_id
                        }
                        Err(e) => {
                            // ownership is only kept together with a loaded
                            // work list; the plan stays processing in the
                            // store and is re-selected next cycle
                            self.state.current_plan = None;
                            return Err(e);
                        }
                    }
                }
                SelectionOutcome::Missed { .. } => {
                    self.stats.plans_missed += 1;
                    return Ok(CycleOutcome::Idle {
                        backoff: self.config.idle_backoff,
                    });
                }
                SelectionOutcome::Idle => {
                    return Ok(CycleOutcome::Idle {
                        backoff: self.config.idle_backoff,
                    });
                }
            },
        };

        // 3. dispatch the front observation
        self.dispatch_front(plan_id).await
    }

    /// Dispatch the observation at the front of the work list. The entry is
    /// popped only after the observation's terminal status is committed, so a
    /// transient failure re-dispatches the same observation and the plan can
    /// never retire with unfinished work.
    async fn dispatch_front(&mut self, plan_id: i64) -> Result<CycleOutcome> {
        let Some(entry) = self.state.work_list.peek() else {
            return Ok(CycleOutcome::Drained);
        };
        let observation_id = entry.observation_id;

        // the list is an index; the store is authoritative
        let Some(observation) = self.repository.find_observation(observation_id).await? else {
            warn!(
                observation_id,
                "Observation vanished from the store, dropping entry"
            );
            self.state.work_list.pop();
            self.stats.entries_skipped += 1;
            return Ok(CycleOutcome::Skipped { observation_id });
        };

        if !observation.is_runnable() {
            debug!(
                observation_id,
                status = %observation.status,
                "Observation no longer runnable, dropping entry"
            );
            self.state.work_list.pop();
            self.stats.entries_skipped += 1;
            return Ok(CycleOutcome::Skipped { observation_id });
        }

        // durable claim before the exposure runs, so an interrupted run finds
        // the observation still runnable and re-dispatches it
        let active =
            observation_machine::determine_target_status(observation.status, &ObservationEvent::Start)?;
        self.repository
            .update_observation_status(observation_id, active, None)
            .await?;

        debug!(
            observation_id,
            plan_id,
            ra = observation.ra,
            dec = observation.dec,
            filter = %observation.filter,
            "Dispatching observation"
        );

        match self.executor.execute(&observation).await {
            Ok(artifact) => {
                let done =
                    observation_machine::determine_target_status(active, &ObservationEvent::Complete)?;
                self.repository
                    .update_observation_status(observation_id, done, Some(&artifact))
                    .await?;
                self.state.work_list.pop();
                self.stats.observations_succeeded += 1;
                info!(observation_id, plan_id, artifact = %artifact, "Observation done");
                log_observation_operation(
                    "dispatch",
                    Some(plan_id),
                    Some(observation_id),
                    "done",
                    Some(artifact.as_str()),
                );
                Ok(CycleOutcome::Dispatched { observation_id })
            }
            Err(e) if e.is_transient() => {
                // entry stays at the front and the observation stays
                // processing; the cycle retries after the error backoff
                Err(FacilityError::from(e))
            }
            Err(e) => {
                let failed = observation_machine::determine_target_status(
                    active,
                    &ObservationEvent::fail_with_error(e.to_string()),
                )?;
                self.repository
                    .update_observation_status(observation_id, failed, None)
                    .await?;
                self.state.work_list.pop();
                self.stats.observations_failed += 1;
                warn!(
                    observation_id,
                    plan_id,
                    error = %e,
                    "Exposure failed, observation recorded as failed"
                );
                log_observation_operation(
                    "dispatch",
                    Some(plan_id),
                    Some(observation_id),
                    "failed",
                    Some(&e.to_string()),
                );
                Ok(CycleOutcome::Dispatched { observation_id })
            }
        }
    }
}
