use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{error::NotificationResult, models::notification::QueueMessage};

pub const RETRIES_HEADER: &str = "x-retries";

/// Consumers hold at most one unacknowledged message.
pub const PREFETCH_COUNT: u16 = 1;

/// A message handed to a consumer and awaiting ack or reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
    /// Value of the retry header, `None` when the header is absent.
    pub retries: Option<u32>,
    pub redelivered: bool,
}

pub type DeliveryStream = BoxStream<'static, NotificationResult<Delivery>>;

#[async_trait]
pub trait MessageBroker: Send + Sync {
    fn queue_name(&self) -> &str;

    /// Publishes a persistent message carrying `message.retries` in the
    /// retry header. Returns only once the broker has taken the message.
    async fn publish(&self, message: &QueueMessage) -> NotificationResult<()>;

    async fn acknowledge(&self, delivery_tag: u64) -> NotificationResult<()>;

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> NotificationResult<()>;

    async fn subscribe(&self) -> NotificationResult<DeliveryStream>;

    async fn health_check(&self) -> NotificationResult<()>;
}
