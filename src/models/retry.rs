use crate::models::notification::DeliveryOutcome;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-publish with this retry count.
    Retry(u32),
    Discard,
}

/// Immediate re-enqueue with a bounded retry count. No delay, no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn decide(&self, retries: u32, outcome: &DeliveryOutcome) -> Option<RetryDecision> {
        decide(retries, outcome, self.max_retries)
    }
}

/// Returns `None` for a successful outcome; there is nothing to decide.
pub fn decide(retries: u32, outcome: &DeliveryOutcome, max_retries: u32) -> Option<RetryDecision> {
    match outcome {
        DeliveryOutcome::Success => None,
        DeliveryOutcome::Failure(_) if retries < max_retries => Some(RetryDecision::Retry(retries + 1)),
        DeliveryOutcome::Failure(_) => Some(RetryDecision::Discard),
    }
}
