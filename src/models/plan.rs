//! Observation plan model
//!
//! A plan is a named batch of observations submitted for a single instrument,
//! valid only inside its validity window. Persistence lives behind
//! [`FacilityRepository`](crate::repository::FacilityRepository); this module
//! holds the data shape and the window arithmetic.

use crate::models::observation::NewObservation;
use crate::state_machine::PlanStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted observation plan.
///
/// `payload` carries the submitter's original request document untouched, the
/// same way the scheduling tooling received it. The queue never interprets
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    /// Unique human-assigned identifier, e.g. `"ToO-2026-08-25-grb"`
    pub name: String,
    pub status: PlanStatus,
    /// Instant the plan becomes eligible for selection
    pub validity_window_start: DateTime<Utc>,
    /// Instant the plan lapses if not yet finished
    pub validity_window_end: DateTime<Utc>,
    pub instrument_id: i64,
    pub payload: serde_json::Value,
    /// Identity of the submitting user or system
    pub requested_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New plan for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlan {
    pub name: String,
    pub instrument_id: i64,
    pub validity_window_start: DateTime<Utc>,
    pub validity_window_end: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub requested_by: String,
    pub observations: Vec<NewObservation>,
}

impl Plan {
    /// The window has opened: the plan may be selected.
    pub fn window_open_at(&self, now: DateTime<Utc>) -> bool {
        self.validity_window_start < now
    }

    /// The window has closed: an unfinished plan must be marked missed.
    pub fn window_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.validity_window_end < now
    }
}

impl NewPlan {
    /// Check submission-time constraints shared by every repository backend.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("plan name must not be empty".to_string());
        }
        if self.validity_window_start >= self.validity_window_end {
            return Err(format!(
                "validity window start {} must precede end {}",
                self.validity_window_start, self.validity_window_end
            ));
        }
        if self.observations.is_empty() {
            return Err("plan must contain at least one observation".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::NewObservation;
    use chrono::Duration;

    fn sample_new_plan() -> NewPlan {
        let now = Utc::now();
        NewPlan {
            name: "ToO-2026-08-25-grb".to_string(),
            instrument_id: 1,
            validity_window_start: now - Duration::hours(1),
            validity_window_end: now + Duration::hours(1),
            payload: serde_json::json!({"trigger": "grb"}),
            requested_by: "scheduler".to_string(),
            observations: vec![NewObservation::at(210.91, 54.31)],
        }
    }

    #[test]
    fn test_window_arithmetic() {
        let now = Utc::now();
        let plan = Plan {
            id: 1,
            name: "n".to_string(),
            status: PlanStatus::Pending,
            validity_window_start: now - Duration::minutes(10),
            validity_window_end: now + Duration::minutes(10),
            instrument_id: 1,
            payload: serde_json::Value::Null,
            requested_by: "scheduler".to_string(),
            created_at: now,
            updated_at: now,
        };

        assert!(plan.window_open_at(now));
        assert!(!plan.window_lapsed_at(now));
        assert!(!plan.window_open_at(now - Duration::minutes(20)));
        assert!(plan.window_lapsed_at(now + Duration::minutes(20)));
    }

    #[test]
    fn test_new_plan_validation() {
        assert!(sample_new_plan().validate().is_ok());

        let mut inverted = sample_new_plan();
        std::mem::swap(
            &mut inverted.validity_window_start,
            &mut inverted.validity_window_end,
        );
        assert!(inverted.validate().is_err());

        let mut empty = sample_new_plan();
        empty.observations.clear();
        assert!(empty.validate().is_err());

        let mut unnamed = sample_new_plan();
        unnamed.name = "  ".to_string();
        assert!(unnamed.validate().is_err());
    }
}
