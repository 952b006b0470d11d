use std::sync::Arc;

use tracing::warn;

use crate::{
    clients::database::AuditStore,
    error::NotificationResult,
    models::{
        audit::{AuditRecord, CreateAuditRecord},
        notification::NotificationRequest,
        validation::validate_request,
    },
    producer::{MessageHandle, QueueProducer},
};

/// Request-side boundary: validate, record, enqueue.
///
/// The audit write and the enqueue are independent steps. A failed enqueue
/// leaves its audit record behind.
#[derive(Clone)]
pub struct NotificationIntake {
    store: Arc<dyn AuditStore>,
    producer: QueueProducer,
}

impl NotificationIntake {
    pub fn new(store: Arc<dyn AuditStore>, producer: QueueProducer) -> Self {
        Self { store, producer }
    }

    pub async fn submit(&self, request: NotificationRequest) -> NotificationResult<MessageHandle> {
        let notification_type = match validate_request(&request) {
            Ok(notification_type) => notification_type,
            Err(e) => {
                warn!(
                    user_id = request.user_id,
                    notification_type = %request.notification_type,
                    "Rejected notification with invalid type"
                );
                return Err(e);
            }
        };

        let id = self
            .store
            .append(CreateAuditRecord::new(
                request.user_id,
                request.message.clone(),
                notification_type,
            ))
            .await?;

        self.producer
            .enqueue(Some(id), request.user_id, request.message, notification_type)
            .await
    }

    pub async fn history(&self, user_id: i64) -> NotificationResult<Vec<AuditRecord>> {
        self.store.list_for_user(user_id).await
    }
}
