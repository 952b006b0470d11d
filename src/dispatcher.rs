use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    clients::channels::DeliveryChannel,
    models::notification::{DeliveryOutcome, NotificationType},
};

/// Routes a notification to the channel for its type. Holds no state and
/// never retries; a channel error becomes `DeliveryOutcome::Failure`.
#[derive(Clone)]
pub struct ChannelDispatcher {
    email: Arc<dyn DeliveryChannel>,
    sms: Arc<dyn DeliveryChannel>,
    in_app: Arc<dyn DeliveryChannel>,
}

impl ChannelDispatcher {
    pub fn new(
        email: Arc<dyn DeliveryChannel>,
        sms: Arc<dyn DeliveryChannel>,
        in_app: Arc<dyn DeliveryChannel>,
    ) -> Self {
        Self { email, sms, in_app }
    }

    fn channel_for(&self, notification_type: NotificationType) -> &Arc<dyn DeliveryChannel> {
        match notification_type {
            NotificationType::Email => &self.email,
            NotificationType::Sms => &self.sms,
            NotificationType::InApp => &self.in_app,
        }
    }

    pub async fn dispatch(&self, notification_type: &str, user_id: i64, message: &str) -> DeliveryOutcome {
        // Upstream already validated the type, but queue data is not trusted.
        let notification_type = match notification_type.parse::<NotificationType>() {
            Ok(notification_type) => notification_type,
            Err(_) => {
                warn!(user_id, notification_type, "Unknown notification type");
                return DeliveryOutcome::Failure(format!(
                    "Unknown notification type: {}",
                    notification_type
                ));
            }
        };

        let channel = self.channel_for(notification_type);

        match channel.deliver(user_id, message).await {
            Ok(()) => {
                debug!(user_id, channel = channel.name(), "Channel delivery succeeded");
                DeliveryOutcome::Success
            }
            Err(e) => {
                warn!(user_id, channel = channel.name(), error = %e, "Channel delivery failed");
                DeliveryOutcome::Failure(e.to_string())
            }
        }
    }
}
