// State machine module for the facility queue
//
// Plan and observation lifecycles are modelled as small explicit state
// machines. Transition computation is pure; persistence of the resulting
// status is the repository's job.

pub mod errors;
pub mod events;
pub mod observation_machine;
pub mod plan_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateTransitionError, StateTransitionResult};
pub use events::{ObservationEvent, PlanEvent};
pub use states::{ObservationStatus, PlanStatus};
