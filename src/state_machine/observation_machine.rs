//! Observation state machine
//!
//! Mirrors the plan machine: pure transition computation, persistence owned by
//! the repository.

use super::errors::{StateTransitionError, StateTransitionResult};
use super::events::ObservationEvent;
use super::states::ObservationStatus;

/// Determine the target status for an observation given its current status
/// and an event.
///
/// `Processing` + `Start` is a valid self-transition so an exposure that was
/// interrupted mid-flight can be dispatched again.
pub fn determine_target_status(
    current_status: ObservationStatus,
    event: &ObservationEvent,
) -> StateTransitionResult<ObservationStatus> {
    let target = match (current_status, event) {
        // Dispatch transitions, including re-dispatch after an interrupted run
        (ObservationStatus::Pending, ObservationEvent::Start) => ObservationStatus::Processing,
        (ObservationStatus::Processing, ObservationEvent::Start) => ObservationStatus::Processing,

        // Exposure outcome
        (ObservationStatus::Processing, ObservationEvent::Complete) => ObservationStatus::Done,
        (ObservationStatus::Processing, ObservationEvent::Fail(_)) => ObservationStatus::Failed,
        (ObservationStatus::Pending, ObservationEvent::Fail(_)) => ObservationStatus::Failed,

        // Invalid transitions
        (from_status, _) => {
            return Err(StateTransitionError::invalid_observation(
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
    fn test_pending_observation_can_start() {
        assert_eq!(
            determine_target_status(ObservationStatus::Pending, &ObservationEvent::Start).unwrap(),
            ObservationStatus::Processing
        );
    }

    #[test]
    fn test_processing_observation_can_complete() {
        assert_eq!(
            determine_target_status(ObservationStatus::Processing, &ObservationEvent::Complete)
                .unwrap(),
            ObservationStatus::Done
        );
    }

    #[test]
    fn test_pending_observation_cannot_complete() {
        let result =
            determine_target_status(ObservationStatus::Pending, &ObservationEvent::Complete);
        assert!(matches!(
            result,
            Err(StateTransitionError::InvalidObservationTransition { .. })
        ));
    }

    #[test]
    fn test_done_observation_is_frozen() {
        for event in [
            ObservationEvent::Start,
            ObservationEvent::Complete,
            ObservationEvent::fail_with_error("shutter stuck"),
        ] {
            assert!(determine_target_status(ObservationStatus::Done, &event).is_err());
        }
    }

    fn arb_observation_status() -> impl Strategy<Value = ObservationStatus> {
        prop_oneof![
            Just(ObservationStatus::Pending),
            Just(ObservationStatus::Processing),
            Just(ObservationStatus::Done),
            Just(ObservationStatus::Failed),
        ]
    }

    fn arb_observation_event() -> impl Strategy<Value = ObservationEvent> {
        prop_oneof![
            Just(ObservationEvent::Start),
            Just(ObservationEvent::Complete),
            ".*".prop_map(ObservationEvent::Fail),
        ]
    }

    proptest! {
        #[test]
        fn terminal_observation_statuses_have_no_outgoing_transitions(
            status in arb_observation_status(),
            event in arb_observation_event(),
        ) {
            if status.is_terminal() {
                prop_assert!(determine_target_status(status, &event).is_err());
            }
        }

        #[test]
        fn runnable_statuses_accept_start(status in arb_observation_status()) {
            let result = determine_target_status(status, &ObservationEvent::Start);
            prop_assert_eq!(result.is_ok(), status.is_runnable());
        }
    }
}
