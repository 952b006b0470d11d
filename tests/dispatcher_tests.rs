use notification_service::models::notification::DeliveryOutcome;

use crate::common::{RecordingChannel, dispatcher_with};

/// Test: Each type is routed to exactly its own channel
#[tokio::test]
async fn test_dispatch_routes_by_type() {
    let email = RecordingChannel::succeeding("email");
    let sms = RecordingChannel::succeeding("sms");
    let in_app = RecordingChannel::succeeding("in_app");
    let dispatcher = dispatcher_with(email.clone(), sms.clone(), in_app.clone());

    assert_eq!(dispatcher.dispatch("email", 1, "a").await, DeliveryOutcome::Success);
    assert_eq!(dispatcher.dispatch("sms", 2, "b").await, DeliveryOutcome::Success);
    assert_eq!(dispatcher.dispatch("in_app", 3, "c").await, DeliveryOutcome::Success);

    assert_eq!(email.calls(), vec![(1, "a".to_string())]);
    assert_eq!(sms.calls(), vec![(2, "b".to_string())]);
    assert_eq!(in_app.calls(), vec![(3, "c".to_string())]);
}

/// Test: Channel errors become failures carrying the reason
#[tokio::test]
async fn test_channel_error_becomes_failure() {
    let sms = RecordingChannel::always_failing("sms");
    let dispatcher = dispatcher_with(
        RecordingChannel::succeeding("email"),
        sms.clone(),
        RecordingChannel::succeeding("in_app"),
    );

    let outcome = dispatcher.dispatch("sms", 2, "hello").await;

    assert_eq!(
        outcome,
        DeliveryOutcome::Failure("sms channel unavailable".to_string())
    );
    assert_eq!(sms.call_count(), 1, "Dispatcher must not retry internally");
}

/// Test: Unknown types fail without touching any channel
#[tokio::test]
async fn test_unknown_type_is_failure() {
    let email = RecordingChannel::succeeding("email");
    let sms = RecordingChannel::succeeding("sms");
    let in_app = RecordingChannel::succeeding("in_app");
    let dispatcher = dispatcher_with(email.clone(), sms.clone(), in_app.clone());

    let outcome = dispatcher.dispatch("fax", 5, "hello").await;

    assert!(matches!(outcome, DeliveryOutcome::Failure(reason) if reason.contains("fax")));
    assert_eq!(email.call_count() + sms.call_count() + in_app.call_count(), 0);
}

/// Test: Same arguments against a deterministic channel give the same outcome
#[tokio::test]
async fn test_dispatch_is_idempotent_for_deterministic_channels() {
    let dispatcher = dispatcher_with(
        RecordingChannel::succeeding("email"),
        RecordingChannel::always_failing("sms"),
        RecordingChannel::succeeding("in_app"),
    );

    for (notification_type, expected_success) in [("email", true), ("sms", false)] {
        let first = dispatcher.dispatch(notification_type, 9, "same").await;
        let second = dispatcher.dispatch(notification_type, 9, "same").await;

        assert_eq!(first, second);
        assert_eq!(first.is_success(), expected_success);
    }
}
