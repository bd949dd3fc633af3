//! Exposure execution
//!
//! [`ExposureExecutor`] is the seam between the queue loop and the physical
//! facility. The loop hands over one observation at a time and waits for the
//! outcome; instrument control, readout, and data handling all live behind
//! this trait.

use crate::error::ExposureError;
use crate::models::{ArtifactRef, Observation};

pub mod simulated;

pub use simulated::SimulatedExecutor;

/// Runs a single exposure to completion.
#[async_trait::async_trait]
pub trait ExposureExecutor: Send + Sync {
    /// Execute the observation and return a reference to its data product.
    ///
    /// Errors split by recoverability: [`ExposureError::Failed`] is final and
    /// the observation is recorded as failed, while
    /// [`ExposureError::Unavailable`] leaves the observation in place so a
    /// later cycle can retry it.
    async fn execute(&self, observation: &Observation) -> Result<ArtifactRef, ExposureError>;
}
