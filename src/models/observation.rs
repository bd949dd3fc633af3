//! Observation model
//!
//! One pointing within a plan: sky coordinates, filter, exposure time, and
//! the artifact reference recorded once the exposure completes.

use crate::state_machine::ObservationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque reference to a completed exposure's data product, e.g. the path of
/// a FITS file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub plan_id: i64,
    pub instrument_id: i64,
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
    /// Photometric filter name, e.g. `"ztfg"`
    pub filter: String,
    /// Exposure time in seconds
    pub exposure_time: f64,
    /// PI of the program the observation belongs to
    pub program_pi: String,
    /// 1 is the most urgent, 5 the least. Only consulted when the queue runs
    /// with priority ordering enabled.
    pub priority: i32,
    pub status: ObservationStatus,
    /// Set when the exposure completes
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when the exposure completes
    pub artifact_ref: Option<ArtifactRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New observation for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObservation {
    pub ra: f64,
    pub dec: f64,
    pub filter: String,
    pub exposure_time: f64,
    pub program_pi: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    crate::constants::system::DEFAULT_OBSERVATION_PRIORITY
}

impl NewObservation {
    /// Point observation at the given coordinates with default instrument
    /// settings. Submission tooling and tests override what they care about.
    pub fn at(ra: f64, dec: f64) -> Self {
        Self {
            ra,
            dec,
            filter: "ztfg".to_string(),
            exposure_time: 300.0,
            program_pi: "queue".to_string(),
            priority: default_priority(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Observation {
    /// Whether this observation still needs dispatching
    pub fn is_runnable(&self) -> bool {
        self.status.is_runnable()
    }

    /// Whether this observation has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
