//! Data models for plans and observations
//!
//! Models are plain data plus small domain helpers. All persistence goes
//! through [`FacilityRepository`](crate::repository::FacilityRepository).

pub mod observation;
pub mod plan;

pub use observation::{ArtifactRef, NewObservation, Observation};
pub use plan::{NewPlan, Plan};
