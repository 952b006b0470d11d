use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tracing::info;

use crate::{
    clients::database::AuditStore,
    models::{audit::CreateAuditRecord, notification::NotificationType},
};

/// One delivery capability per notification type.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), Error>;
}

fn check_simulated_failure(
    simulated_failure: &Option<String>,
    channel: &str,
    message: &str,
) -> Result<(), Error> {
    match simulated_failure {
        Some(trigger) if trigger == message => {
            Err(anyhow!("Simulated {} failure for testing retries", channel))
        }
        _ => Ok(()),
    }
}

pub struct EmailChannel {
    simulated_failure: Option<String>,
}

impl EmailChannel {
    pub fn new(simulated_failure: Option<String>) -> Self {
        Self { simulated_failure }
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), Error> {
        check_simulated_failure(&self.simulated_failure, "email", message)?;

        info!(user_id, message, "Sending email notification");
        Ok(())
    }
}

pub struct SmsChannel {
    simulated_failure: Option<String>,
}

impl SmsChannel {
    pub fn new(simulated_failure: Option<String>) -> Self {
        Self { simulated_failure }
    }
}

#[async_trait]
impl DeliveryChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), Error> {
        check_simulated_failure(&self.simulated_failure, "SMS", message)?;

        info!(user_id, message, "Sending SMS notification");
        Ok(())
    }
}

/// Stores the notification so the user sees it the next time they list
/// their notifications.
pub struct InAppChannel {
    store: Arc<dyn AuditStore>,
    simulated_failure: Option<String>,
}

impl InAppChannel {
    pub fn new(store: Arc<dyn AuditStore>, simulated_failure: Option<String>) -> Self {
        Self {
            store,
            simulated_failure,
        }
    }
}

#[async_trait]
impl DeliveryChannel for InAppChannel {
    fn name(&self) -> &'static str {
        "in_app"
    }

    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), Error> {
        check_simulated_failure(&self.simulated_failure, "in-app", message)?;

        let id = self
            .store
            .append(CreateAuditRecord::new(
                user_id,
                message.to_string(),
                NotificationType::InApp,
            ))
            .await?;

        info!(user_id, record_id = id, "In-app notification stored");
        Ok(())
    }
}
