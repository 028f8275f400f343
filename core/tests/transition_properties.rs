//! Property tests for the status transition engine.
#![allow(clippy::unwrap_used)]

use chrono::Utc;
use complaint_desk_core::prelude::*;
use proptest::prelude::*;

fn status() -> impl Strategy<Value = ComplaintStatus> {
    prop::sample::select(ComplaintStatus::ALL.to_vec())
}

fn remark() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        "[ \t\n]{0,3}".prop_map(Some),
        "[a-zA-Z][a-zA-Z ]{0,15}".prop_map(Some),
    ]
}

fn blank_remark() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[ \t\n]{0,4}".prop_map(Some)]
}

fn filed() -> ComplaintRecord {
    ComplaintRecord::file(
        ComplaintId::new(),
        UserId::new(),
        RestaurantId::new(),
        "Found a bone in the fillet",
        Utc::now(),
    )
    .unwrap()
}

fn at_status(status: ComplaintStatus) -> ComplaintRecord {
    apply_transition(&filed(), status, Some("setup"), UserId::new(), Utc::now()).unwrap()
}

proptest! {
    #[test]
    fn accepted_transitions_are_monotonic_and_logged(
        requests in prop::collection::vec((status(), remark()), 1..24)
    ) {
        let mut record = filed();

        for (requested, remark) in requests {
            let before = record.clone();
            match apply_transition(&record, requested, remark.as_deref(), UserId::new(), Utc::now()) {
                Ok(next) => {
                    prop_assert!(next.status() >= before.status());
                    prop_assert_eq!(next.activity_log().len(), before.activity_log().len() + 1);
                    prop_assert_eq!(next.activity_log().last().unwrap().status, next.status());
                    prop_assert_eq!(&next.activity_log()[..before.activity_log().len()], before.activity_log());
                    record = next;
                }
                Err(_) => {
                    prop_assert_eq!(record.status(), before.status());
                    prop_assert_eq!(record.activity_log(), before.activity_log());
                }
            }
        }

        prop_assert_eq!(record.activity_log()[0].status, ComplaintStatus::Submitted);
    }

    #[test]
    fn blank_remark_never_reaches_action_taken_or_resolved(
        current in status(),
        requested in prop::sample::select(vec![ComplaintStatus::ActionTaken, ComplaintStatus::Resolved]),
        remark in blank_remark(),
    ) {
        let record = at_status(current);
        let result = apply_transition(&record, requested, remark.as_deref(), UserId::new(), Utc::now());

        if requested < current {
            let is_backward = matches!(result, Err(TransitionError::BackwardTransition { .. }));
            prop_assert!(is_backward);
        } else {
            prop_assert_eq!(result.unwrap_err(), TransitionError::RemarkRequired { status: requested });
        }
    }

    #[test]
    fn earlier_targets_are_always_rejected(
        current in status(),
        requested in status(),
        remark in remark(),
    ) {
        prop_assume!(requested < current);
        let record = at_status(current);
        let log_len = record.activity_log().len();

        let result = apply_transition(&record, requested, remark.as_deref(), UserId::new(), Utc::now());

        prop_assert_eq!(
            result.unwrap_err(),
            TransitionError::BackwardTransition { from: current, to: requested }
        );
        prop_assert_eq!(record.status(), current);
        prop_assert_eq!(record.activity_log().len(), log_len);
    }
}
