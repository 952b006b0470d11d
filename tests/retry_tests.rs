use notification_service::models::{
    notification::DeliveryOutcome,
    retry::{DEFAULT_MAX_RETRIES, RetryDecision, RetryPolicy, decide},
};

fn failure() -> DeliveryOutcome {
    DeliveryOutcome::Failure("channel unavailable".to_string())
}

/// Test: Failures below the limit are retried with an incremented count
#[test]
fn test_failure_below_max_retries_is_retried() {
    for retries in 0..5 {
        assert_eq!(
            decide(retries, &failure(), 5),
            Some(RetryDecision::Retry(retries + 1)),
            "retries={} should be retried",
            retries
        );
    }
}

/// Test: A failure at the limit is discarded
#[test]
fn test_failure_at_max_retries_is_discarded() {
    assert_eq!(decide(3, &failure(), 3), Some(RetryDecision::Discard));
}

/// Test: A count already past the limit is discarded, not retried again
#[test]
fn test_failure_above_max_retries_is_discarded() {
    assert_eq!(decide(7, &failure(), 3), Some(RetryDecision::Discard));
}

/// Test: Success never produces a retry decision
#[test]
fn test_success_has_no_decision() {
    for retries in [0, 2, 3, 10] {
        assert_eq!(decide(retries, &DeliveryOutcome::Success, 3), None);
    }
}

/// Test: Zero max retries discards on the first failure
#[test]
fn test_zero_max_retries_discards_immediately() {
    assert_eq!(decide(0, &failure(), 0), Some(RetryDecision::Discard));
}

/// Test: Identical inputs always yield the identical decision
#[test]
fn test_decision_is_deterministic() {
    let policy = RetryPolicy::default();

    for retries in 0..=DEFAULT_MAX_RETRIES + 1 {
        let first = policy.decide(retries, &failure());
        let second = policy.decide(retries, &failure());
        assert_eq!(first, second);
    }
}

/// Test: The default policy walks 0 -> 1 -> 2 -> 3 -> discard
#[test]
fn test_default_policy_retry_chain() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);

    let mut retries = 0;
    let mut chain = vec![retries];

    while let Some(RetryDecision::Retry(next)) = policy.decide(retries, &failure()) {
        retries = next;
        chain.push(retries);
    }

    assert_eq!(chain, vec![0, 1, 2, 3]);
    assert_eq!(policy.decide(retries, &failure()), Some(RetryDecision::Discard));
}
