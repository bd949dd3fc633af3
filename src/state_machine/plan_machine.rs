//! Plan state machine
//!
//! Transitions are computed as a pure function of the current status and the
//! event. Persistence happens separately through the repository, so callers
//! validate a transition before committing it.

use super::errors::{StateTransitionError, StateTransitionResult};
use super::events::PlanEvent;
use super::states::PlanStatus;

/// Determine the target status for a plan given its current status and an event.
///
/// `Processing` + `Start` is a valid self-transition: a plan stranded in
/// `Processing` by an interrupted run is re-claimed on the next selection pass.
pub fn determine_target_status(
    current_status: PlanStatus,
    event: &PlanEvent,
) -> StateTransitionResult<PlanStatus> {
    let target = match (current_status, event) {
        // Claim transitions, including re-claim after an interrupted run
        (PlanStatus::Pending, PlanEvent::Start) => PlanStatus::Processing,
        (PlanStatus::Processing, PlanEvent::Start) => PlanStatus::Processing,

        // Completion once the work list has drained
        (PlanStatus::Processing, PlanEvent::Complete) => PlanStatus::Done,

        // Window lapse can strike before or after the plan was claimed
        (PlanStatus::Pending, PlanEvent::Miss) => PlanStatus::Missed,
        (PlanStatus::Processing, PlanEvent::Miss) => PlanStatus::Missed,

        // Abandonment
        (PlanStatus::Pending, PlanEvent::Fail(_)) => PlanStatus::Failed,
        (PlanStatus::Processing, PlanEvent::Fail(_)) => PlanStatus::Failed,

        // Invalid transitions
        (from_status, _) => {
            return Err(StateTransitionError::invalid_plan(
                from_status,
                event.event_type(),
            ))
        }
    };

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pending_plan_can_start() {
        assert_eq!(
            determine_target_status(PlanStatus::Pending, &PlanEvent::Start).unwrap(),
            PlanStatus::Processing
        );
    }

    #[test]
    fn test_processing_plan_can_be_reclaimed() {
        assert_eq!(
            determine_target_status(PlanStatus::Processing, &PlanEvent::Start).unwrap(),
            PlanStatus::Processing
        );
    }

    #[test]
    fn test_pending_plan_cannot_complete() {
        let result = determine_target_status(PlanStatus::Pending, &PlanEvent::Complete);
        assert!(matches!(
            result,
            Err(StateTransitionError::InvalidPlanTransition { .. })
        ));
    }

    #[test]
    fn test_miss_applies_before_and_after_claim() {
        assert_eq!(
            determine_target_status(PlanStatus::Pending, &PlanEvent::Miss).unwrap(),
            PlanStatus::Missed
        );
        assert_eq!(
            determine_target_status(PlanStatus::Processing, &PlanEvent::Miss).unwrap(),
            PlanStatus::Missed
        );
    }

    fn arb_plan_status() -> impl Strategy<Value = PlanStatus> {
        prop_oneof![
            Just(PlanStatus::Pending),
            Just(PlanStatus::Processing),
            Just(PlanStatus::Done),
            Just(PlanStatus::Missed),
            Just(PlanStatus::Failed),
        ]
    }

    fn arb_plan_event() -> impl Strategy<Value = PlanEvent> {
        prop_oneof![
            Just(PlanEvent::Start),
            Just(PlanEvent::Complete),
            Just(PlanEvent::Miss),
            ".*".prop_map(PlanEvent::Fail),
        ]
    }

    proptest! {
        #[test]
        fn terminal_plan_statuses_have_no_outgoing_transitions(
            status in arb_plan_status(),
            event in arb_plan_event(),
        ) {
            if status.is_terminal() {
                prop_assert!(determine_target_status(status, &event).is_err());
            }
        }

        #[test]
        fn valid_transitions_never_leave_the_status_set(
            status in arb_plan_status(),
            event in arb_plan_event(),
        ) {
            if let Ok(target) = determine_target_status(status, &event) {
                prop_assert!(target.is_selectable() || target.is_terminal());
            }
        }
    }
}
