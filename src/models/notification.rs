use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, NotificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Email,
    Sms,
    InApp,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Sms => "sms",
            NotificationType::InApp => "in_app",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(NotificationType::Email),
            "sms" => Ok(NotificationType::Sms),
            "in_app" => Ok(NotificationType::InApp),
            other => Err(NotificationError::Validation(other.to_string())),
        }
    }
}

/// Intake payload. `notification_type` stays a raw string until validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub user_id: i64,
    pub message: String,

    #[serde(rename = "type")]
    pub notification_type: String,
}

/// The unit carried on the queue.
///
/// `retries` never appears in the JSON body; it travels in the `x-retries`
/// header and is attached on read. The type is kept as the raw wire string so
/// that an unrecognised value reaching the consumer is a delivery failure
/// rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub message: String,

    #[serde(rename = "type")]
    pub notification_type: String,

    #[serde(skip)]
    pub retries: u32,
}

impl QueueMessage {
    pub fn new(id: Option<i64>, user_id: i64, message: String, notification_type: NotificationType) -> Self {
        Self {
            id,
            user_id,
            message,
            notification_type: notification_type.as_str().to_string(),
            retries: 0,
        }
    }

    /// Same logical notification, next link in the retry chain.
    pub fn with_retries(&self, retries: u32) -> Self {
        Self {
            retries,
            ..self.clone()
        }
    }

    pub fn to_payload(&self) -> NotificationResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| NotificationError::MalformedMessage(e.to_string()))
    }

    /// Parses a delivered body. A missing retry header means a fresh message.
    pub fn from_delivery(body: &[u8], retries: Option<u32>) -> NotificationResult<Self> {
        let mut message = serde_json::from_slice::<Self>(body)
            .map_err(|e| NotificationError::MalformedMessage(e.to_string()))?;
        message.retries = retries.unwrap_or(0);
        Ok(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Failure(String),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Success => None,
            DeliveryOutcome::Failure(reason) => Some(reason),
        }
    }
}
