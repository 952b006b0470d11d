use thiserror::Error;

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// Rejected at intake, never enqueued.
    #[error("Invalid notification type: {0}")]
    Validation(String),

    /// Broker connection or publish failure.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// A channel capability failed. Handled by the retry policy.
    #[error("Delivery failed: {0}")]
    DeliveryFailure(String),

    /// Message body could not be parsed. Never retried.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Max retries exceeded after {retries} retries")]
    MaxRetriesExceeded { retries: u32 },

    #[error("Audit store error: {0}")]
    AuditStore(String),
}

impl NotificationError {
    pub fn queue(error: impl std::fmt::Display) -> Self {
        Self::QueueUnavailable(error.to_string())
    }

    pub fn audit(error: impl std::fmt::Display) -> Self {
        Self::AuditStore(error.to_string())
    }
}
