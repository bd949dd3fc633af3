use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Initial state when plan is created
    Pending,
    /// Plan is owned by the queue loop and its observations are being dispatched
    Processing,
    /// Every observation reached a terminal state
    Done,
    /// Validity window closed before the plan finished
    Missed,
    /// Plan was abandoned by an operator or an external process
    Failed,
}

impl PlanStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Missed | Self::Failed)
    }

    /// Check if this plan can be picked up by the selector
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Check if this is an active state (plan is being worked)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Missed => write!(f, "missed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "missed" => Ok(Self::Missed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid plan status: {s}")),
        }
    }
}

/// Observation lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    /// Initial state when observation is created
    Pending,
    /// Observation has been handed to the exposure executor
    Processing,
    /// Exposure completed and the artifact reference was recorded
    Done,
    /// Exposure failed permanently
    Failed,
}

impl ObservationStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if this observation still needs to be dispatched. `Processing`
    /// counts as runnable so an exposure interrupted by a crash runs again.
    pub fn is_runnable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Check if this is an active state (executor currently owns it)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ObservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid observation status: {s}")),
        }
    }
}

/// Default state for new plans
impl Default for PlanStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Default state for new observations
impl Default for ObservationStatus {
    fn default() -> Self {
        Self::Pending
    }
}
