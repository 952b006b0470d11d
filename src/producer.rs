use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::{
    clients::broker::MessageBroker,
    error::NotificationResult,
    models::notification::{NotificationType, QueueMessage},
};

/// Returned once a notification is durably on the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageHandle {
    pub id: Option<i64>,
    pub queue: String,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QueueProducer {
    broker: Arc<dyn MessageBroker>,
}

impl QueueProducer {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    /// Publishes a fresh message with `retries = 0`. The caller has already
    /// validated the type. Publish failures surface as `QueueUnavailable`
    /// and are not retried here.
    pub async fn enqueue(
        &self,
        id: Option<i64>,
        user_id: i64,
        message: String,
        notification_type: NotificationType,
    ) -> NotificationResult<MessageHandle> {
        let queue_message = QueueMessage::new(id, user_id, message, notification_type);

        if let Err(e) = self.broker.publish(&queue_message).await {
            error!(
                user_id,
                notification_type = %notification_type,
                error = %e,
                "Failed to publish notification"
            );
            return Err(e);
        }

        info!(
            id = ?id,
            user_id,
            notification_type = %notification_type,
            queue = self.broker.queue_name(),
            "Notification enqueued"
        );

        Ok(MessageHandle {
            id,
            queue: self.broker.queue_name().to_string(),
            enqueued_at: Utc::now(),
        })
    }
}
