use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::notification::NotificationType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: i64,
    pub message: String,

    #[serde(rename = "type")]
    pub notification_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAuditRecord {
    pub user_id: i64,
    pub message: String,
    pub notification_type: NotificationType,
}

impl CreateAuditRecord {
    pub fn new(user_id: i64, message: String, notification_type: NotificationType) -> Self {
        Self {
            user_id,
            message,
            notification_type,
        }
    }
}
