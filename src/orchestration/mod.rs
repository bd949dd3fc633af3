//! # Orchestration Engine
//!
//! Serialized plan execution core for the observation queue.
//!
//! ## Core Components
//!
//! - **QueueService**: Main loop that owns at most one plan at a time and
//!   drives retire, select, and dispatch cycles
//! - **PlanSelector**: Store-side decisions about which plan to own next,
//!   when a lapsed plan is marked missed, and when a drained plan retires
//! - **WorkList**: In-memory dispatch index over the owned plan's runnable
//!   observations, FIFO by default or priority-ordered when configured
//!
//! The store is authoritative throughout. The work list is rebuilt from it
//! whenever a plan is selected, every status change is committed before
//! in-memory state moves, and a restarted service resumes from whatever the
//! store says.

pub mod plan_selector;
pub mod queue_service;
pub mod work_list;

// Re-export core types and components for easy access
pub use plan_selector::{PlanSelector, SelectionOutcome};
pub use queue_service::{CycleOutcome, QueueService, QueueServiceConfig, QueueState, QueueStats};
pub use work_list::{WorkEntry, WorkList};
