#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Facility Core
//!
//! Execution core for a robotic observatory's observation queue.
//!
//! ## Overview
//!
//! Observers submit **observation plans**: named batches of exposures with a
//! validity window during which they may run. A single long-running queue
//! service owns at most one plan at a time, dispatches its observations
//! serially through the instrument executor, and retires the plan once every
//! dispatched observation has reached a terminal status. Plans whose window
//! has already lapsed are marked missed without dispatching anything.
//!
//! ## Architecture
//!
//! The persistent store is authoritative. The service keeps only a small
//! in-memory cursor (the owned plan id and a work list of observation ids)
//! and rebuilds it from the store whenever a plan is selected. Every status
//! change is committed before in-memory state advances, so a crashed or
//! restarted service resumes mid-plan without duplicating completed work.
//!
//! ## Module Organization
//!
//! - [`models`] - Plans, observations, and artifact references
//! - [`repository`] - Persistent store trait with PostgreSQL and in-memory backends
//! - [`state_machine`] - Plan and observation status transitions
//! - [`orchestration`] - The queue service loop, plan selection, and work list
//! - [`executor`] - Instrument exposure execution
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use facility_core::config::FacilityConfig;
//! use facility_core::executor::SimulatedExecutor;
//! use facility_core::orchestration::{QueueService, QueueServiceConfig};
//! use facility_core::repository::MemoryRepository;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = FacilityConfig::default();
//! let repository = Arc::new(MemoryRepository::new());
//! let executor = Arc::new(SimulatedExecutor::from_config(&config.executor));
//!
//! let service = QueueService::new(repository, executor, QueueServiceConfig::from(&config));
//! service.run().await;
//! # }
//! ```
//!
//! ## Testing
//!
//! The in-memory repository backs most tests; loop timing is exercised under
//! Tokio's paused clock:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod repository;
pub mod state_machine;

pub use config::{DatabaseConfig, ExecutorConfig, FacilityConfig, QueueConfig};
pub use constants::{status_groups, system, ObservationStatus, PlanStatus};
pub use error::{FacilityError, Result};
pub use executor::{ExposureExecutor, SimulatedExecutor};
pub use models::{ArtifactRef, NewObservation, NewPlan, Observation, Plan};
pub use orchestration::{
    CycleOutcome, PlanSelector, QueueService, QueueServiceConfig, QueueStats, SelectionOutcome,
    WorkList,
};
pub use repository::{wait_until_ready, FacilityRepository, MemoryRepository};

#[cfg(feature = "postgres")]
pub use repository::PgRepository;
