use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    clients::broker::{Delivery, MessageBroker},
    dispatcher::ChannelDispatcher,
    error::{NotificationError, NotificationResult},
    models::{
        notification::QueueMessage,
        retry::{RetryDecision, RetryPolicy},
    },
};

/// How a single delivery was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlingResult {
    /// Channel succeeded, original acknowledged.
    Delivered,
    /// Re-published with this retry count, then acknowledged.
    Retried { retries: u32 },
    /// Retry budget spent, acknowledged without re-publishing.
    Discarded { retries: u32 },
    /// Body could not be parsed, acknowledged without dispatching.
    Malformed,
    /// Re-publication failed, original handed back to the broker untouched.
    Requeued,
}

pub struct QueueConsumer {
    broker: Arc<dyn MessageBroker>,
    dispatcher: ChannelDispatcher,
    policy: RetryPolicy,
}

impl QueueConsumer {
    pub fn new(broker: Arc<dyn MessageBroker>, dispatcher: ChannelDispatcher, policy: RetryPolicy) -> Self {
        Self {
            broker,
            dispatcher,
            policy,
        }
    }

    /// Handles one delivery to completion. Every path ends in exactly one
    /// ack or reject of `delivery`; an `Err` means that final call failed.
    pub async fn handle_delivery(&self, delivery: &Delivery) -> NotificationResult<HandlingResult> {
        let tag = delivery.delivery_tag;

        let message = match QueueMessage::from_delivery(&delivery.body, delivery.retries) {
            Ok(message) => message,
            Err(e) => {
                error!(delivery_tag = tag, error = %e, "Discarding malformed message");
                self.broker.acknowledge(tag).await?;
                return Ok(HandlingResult::Malformed);
            }
        };

        debug!(
            delivery_tag = tag,
            user_id = message.user_id,
            notification_type = %message.notification_type,
            retries = message.retries,
            redelivered = delivery.redelivered,
            "Processing notification message"
        );

        let outcome = self
            .dispatcher
            .dispatch(&message.notification_type, message.user_id, &message.message)
            .await;

        let decision = match self.policy.decide(message.retries, &outcome) {
            None => {
                self.broker.acknowledge(tag).await?;
                info!(
                    user_id = message.user_id,
                    notification_type = %message.notification_type,
                    retries = message.retries,
                    "Processed notification"
                );
                return Ok(HandlingResult::Delivered);
            }
            Some(decision) => decision,
        };
        let reason = outcome.failure_reason().unwrap_or_default();

        match decision {
            RetryDecision::Retry(retries) => {
                let failure = NotificationError::DeliveryFailure(reason.to_string());
                info!(
                    user_id = message.user_id,
                    notification_type = %message.notification_type,
                    retry = retries,
                    error = %failure,
                    "Retrying immediately"
                );

                // The original is only acknowledged once its successor is on the queue.
                if let Err(e) = self.broker.publish(&message.with_retries(retries)).await {
                    warn!(
                        delivery_tag = tag,
                        user_id = message.user_id,
                        error = %e,
                        "Re-publish failed, returning message to the queue"
                    );
                    self.broker.reject(tag, true).await?;
                    return Ok(HandlingResult::Requeued);
                }

                self.broker.acknowledge(tag).await?;
                Ok(HandlingResult::Retried { retries })
            }
            RetryDecision::Discard => {
                let exhausted = NotificationError::MaxRetriesExceeded {
                    retries: message.retries,
                };
                error!(
                    id = ?message.id,
                    user_id = message.user_id,
                    notification_type = %message.notification_type,
                    retries = message.retries,
                    last_error = %reason,
                    error = %exhausted,
                    "Max retries reached, discarding message"
                );
                self.broker.acknowledge(tag).await?;
                Ok(HandlingResult::Discarded {
                    retries: message.retries,
                })
            }
        }
    }

    /// Consumes until the stream ends or `shutdown` fires. Shutdown is only
    /// observed between messages and takes priority over a ready delivery.
    pub async fn run<S>(&self, mut deliveries: S, shutdown: CancellationToken) -> NotificationResult<()>
    where
        S: Stream<Item = NotificationResult<Delivery>> + Unpin,
    {
        info!(queue = self.broker.queue_name(), "Worker started, waiting for messages");

        loop {
            let next = tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("Worker received shutdown signal");
                    break;
                }
                next = deliveries.next() => next,
            };

            match next {
                Some(Ok(delivery)) => match self.handle_delivery(&delivery).await {
                    Ok(result) => debug!(delivery_tag = delivery.delivery_tag, ?result, "Delivery handled"),
                    Err(e) => error!(
                        delivery_tag = delivery.delivery_tag,
                        error = %e,
                        "Failed to settle delivery"
                    ),
                },
                Some(Err(e)) => {
                    error!(error = %e, "Delivery stream failed");
                    return Err(e);
                }
                None => {
                    info!("Delivery stream closed");
                    break;
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }
}
