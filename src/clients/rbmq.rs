use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        BasicRejectOptions, ConfirmSelectOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable, ShortString},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clients::broker::{Delivery, DeliveryStream, MessageBroker, PREFETCH_COUNT, RETRIES_HEADER},
    error::{NotificationError, NotificationResult},
    models::notification::QueueMessage,
};

const PERSISTENT_DELIVERY_MODE: u8 = 2;

pub struct RabbitMqClient {
    connection: Connection,
    channel: Channel,
    queue_name: String,
}

impl RabbitMqClient {
    pub async fn connect(rabbitmq_url: &str, queue_name: &str) -> NotificationResult<Self> {
        info!("Connecting to RabbitMQ");

        let connection = Connection::connect(rabbitmq_url, ConnectionProperties::default())
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to connect to RabbitMQ: {}", e)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| NotificationError::queue(format!("RabbitMQ channel creation failed: {}", e)))?;

        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to set up QoS: {}", e)))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to enable publisher confirms: {}", e)))?;

        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to declare queue: {}", e)))?;

        info!(queue = queue_name, prefetch = PREFETCH_COUNT, "RabbitMQ channel ready");

        Ok(Self {
            connection,
            channel,
            queue_name: queue_name.to_string(),
        })
    }
}

#[async_trait]
impl MessageBroker for RabbitMqClient {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn publish(&self, message: &QueueMessage) -> NotificationResult<()> {
        let payload = message.to_payload()?;

        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
            .with_content_type(ShortString::from("application/json"))
            .with_headers(retry_headers(message.retries));

        let confirmation = self
            .channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to publish message: {}", e)))?
            .await
            .map_err(|e| NotificationError::queue(format!("Publisher confirm failed: {}", e)))?;

        if confirmation.is_nack() {
            return Err(NotificationError::queue("Broker rejected published message"));
        }

        debug!(
            user_id = message.user_id,
            retries = message.retries,
            "Message published"
        );

        Ok(())
    }

    async fn acknowledge(&self, delivery_tag: u64) -> NotificationResult<()> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to acknowledge message: {}", e)))?;

        Ok(())
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> NotificationResult<()> {
        self.channel
            .basic_reject(delivery_tag, BasicRejectOptions { requeue })
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to reject message: {}", e)))?;

        Ok(())
    }

    async fn subscribe(&self) -> NotificationResult<DeliveryStream> {
        let consumer_tag = format!("notification_worker_{}", Uuid::new_v4());

        let consumer = self
            .channel
            .basic_consume(
                &self.queue_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| NotificationError::queue(format!("Failed to create consumer: {}", e)))?;

        info!(queue = %self.queue_name, consumer_tag = %consumer_tag, "Consumer created for queue");

        Ok(consumer
            .map(|result| result.map(Delivery::from).map_err(NotificationError::queue))
            .boxed())
    }

    async fn health_check(&self) -> NotificationResult<()> {
        ensure_open(
            self.connection.status().connected(),
            self.channel.status().connected(),
        )
    }
}

impl From<lapin::message::Delivery> for Delivery {
    fn from(delivery: lapin::message::Delivery) -> Self {
        let retries = retries_from_headers(delivery.properties.headers().as_ref());

        Self {
            delivery_tag: delivery.delivery_tag,
            body: delivery.data,
            retries,
            redelivered: delivery.redelivered,
        }
    }
}

/// A channel can close on its own (e.g. a precondition failure) while the
/// connection stays up; publishing is impossible in either case.
pub fn ensure_open(connection_open: bool, channel_open: bool) -> NotificationResult<()> {
    if !connection_open {
        return Err(NotificationError::queue("RabbitMQ connection is not open"));
    }
    if !channel_open {
        return Err(NotificationError::queue("RabbitMQ channel is closed"));
    }
    Ok(())
}

pub fn retry_headers(retries: u32) -> FieldTable {
    let mut headers = FieldTable::default();
    headers.insert(
        ShortString::from(RETRIES_HEADER),
        AMQPValue::LongLongInt(i64::from(retries)),
    );
    headers
}

/// Reads the retry header. Publishers may encode it with any integer width;
/// negative or non-integer values are treated as absent.
pub fn retries_from_headers(headers: Option<&FieldTable>) -> Option<u32> {
    let value = headers?
        .inner()
        .iter()
        .find(|(key, _)| key.as_str() == RETRIES_HEADER)
        .map(|(_, value)| value)?;

    let retries = match value {
        AMQPValue::ShortShortInt(v) => i64::from(*v),
        AMQPValue::ShortShortUInt(v) => i64::from(*v),
        AMQPValue::ShortInt(v) => i64::from(*v),
        AMQPValue::ShortUInt(v) => i64::from(*v),
        AMQPValue::LongInt(v) => i64::from(*v),
        AMQPValue::LongUInt(v) => i64::from(*v),
        AMQPValue::LongLongInt(v) => *v,
        other => {
            warn!(value = ?other, "Ignoring non-integer retry header");
            return None;
        }
    };

    u32::try_from(retries).ok()
}
