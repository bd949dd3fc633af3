//! Simulated exposure executor
//!
//! Stands in for real instrument control: waits out the configured exposure
//! delay, then writes a placeholder FITS file named after the observation id
//! and returns its path as the artifact reference.

use super::ExposureExecutor;
use crate::config::ExecutorConfig;
use crate::error::ExposureError;
use crate::models::{ArtifactRef, Observation};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub struct SimulatedExecutor {
    artifact_directory: PathBuf,
    exposure_delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(artifact_directory: impl Into<PathBuf>, exposure_delay: Duration) -> Self {
        Self {
            artifact_directory: artifact_directory.into(),
            exposure_delay,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(&config.artifact_directory, config.exposure_delay())
    }
}

#[async_trait]
impl ExposureExecutor for SimulatedExecutor {
    async fn execute(&self, observation: &Observation) -> Result<ArtifactRef, ExposureError> {
        debug!(
            observation_id = observation.id,
            ra = observation.ra,
            dec = observation.dec,
            filter = %observation.filter,
            "Starting simulated exposure"
        );

        tokio::time::sleep(self.exposure_delay).await;

        // IO faults are reported as Unavailable so the observation is
        // retried once the directory is writable again
        tokio::fs::create_dir_all(&self.artifact_directory)
            .await
            .map_err(|e| {
                ExposureError::unavailable(format!("artifact directory unavailable: {e}"))
            })?;

        let path = self
            .artifact_directory
            .join(format!("{}.fits", observation.id));
        let placeholder = format!(
            "SIMPLE  =                    T / placeholder for observation {}\n",
            observation.id
        );
        tokio::fs::write(&path, placeholder)
            .await
            .map_err(|e| ExposureError::unavailable(format!("failed to write artifact: {e}")))?;

        info!(
            observation_id = observation.id,
            artifact = %path.display(),
            "Simulated exposure complete"
        );

        Ok(ArtifactRef::from_path(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ObservationStatus;
    use chrono::Utc;

    fn observation(id: i64) -> Observation {
        let now = Utc::now();
        Observation {
            id,
            plan_id: 1,
            instrument_id: 1,
            ra: 210.91,
            dec: 54.31,
            filter: "ztfg".to_string(),
            exposure_time: 300.0,
            program_pi: "queue".to_string(),
            priority: 5,
            status: ObservationStatus::Processing,
            completed_at: None,
            artifact_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_placeholder_artifact_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let executor = SimulatedExecutor::new(dir.path(), Duration::ZERO);

        let artifact = executor.execute(&observation(7)).await.unwrap();

        assert!(artifact.as_str().ends_with("7.fits"));
        let content = tokio::fs::read_to_string(dir.path().join("7.fits"))
            .await
            .unwrap();
        assert!(content.contains("observation 7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exposure_delay_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let executor = SimulatedExecutor::new(dir.path(), Duration::from_secs(10));

        let start = tokio::time::Instant::now();
        executor.execute(&observation(1)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unwritable_directory_reports_unavailable() {
        // a regular file where the directory should be makes create_dir_all fail
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        tokio::fs::write(&blocked, b"not a directory").await.unwrap();

        let executor = SimulatedExecutor::new(&blocked, Duration::ZERO);
        let err = executor.execute(&observation(1)).await.unwrap_err();

        assert!(err.is_transient());
    }
}
