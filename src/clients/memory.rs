//! Process-local broker and audit store.
//!
//! Both record every settled message so callers can inspect what a
//! component did to the queue.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{StreamExt, stream};
use tokio::sync::Notify;

use crate::{
    clients::{
        broker::{Delivery, DeliveryStream, MessageBroker, PREFETCH_COUNT},
        database::AuditStore,
    },
    error::{NotificationError, NotificationResult},
    models::{
        audit::{AuditRecord, CreateAuditRecord},
        notification::QueueMessage,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub body: Vec<u8>,
    pub retries: Option<u32>,
    pub redelivered: bool,
}

#[derive(Default)]
struct BrokerState {
    ready: VecDeque<StoredMessage>,
    unacked: HashMap<u64, StoredMessage>,
    next_tag: u64,
    published: Vec<StoredMessage>,
    acknowledged: Vec<u64>,
    rejected: Vec<(u64, bool)>,
}

struct BrokerInner {
    queue_name: String,
    state: Mutex<BrokerState>,
    notify: Notify,
    closed: AtomicBool,
    fail_publish: AtomicBool,
}

#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<BrokerInner>,
}

impl InMemoryBroker {
    pub fn new(queue_name: &str) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                queue_name: queue_name.to_string(),
                state: Mutex::new(BrokerState::default()),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
                fail_publish: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueues a raw body, bypassing serialization. Test hook for
    /// malformed payloads and missing headers.
    pub fn publish_raw(&self, body: Vec<u8>, retries: Option<u32>) {
        self.inner.push(StoredMessage {
            body,
            retries,
            redelivered: false,
        });
    }

    /// Makes every subsequent `publish` fail with `QueueUnavailable`.
    pub fn set_publish_failure(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Ends the subscription stream once the queue is drained and nothing
    /// is left unacknowledged. Publishing is still accepted.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        self.inner.notify.notify_one();
    }

    /// Hands out the next ready message, or `None` if the queue is empty or
    /// the prefetch window is full.
    pub fn receive(&self) -> Option<Delivery> {
        self.inner.receive()
    }

    pub fn ready_count(&self) -> usize {
        self.inner.lock().ready.len()
    }

    pub fn unacked_count(&self) -> usize {
        self.inner.lock().unacked.len()
    }

    pub fn published(&self) -> Vec<StoredMessage> {
        self.inner.lock().published.clone()
    }

    pub fn acknowledged(&self) -> Vec<u64> {
        self.inner.lock().acknowledged.clone()
    }

    pub fn rejected(&self) -> Vec<(u64, bool)> {
        self.inner.lock().rejected.clone()
    }
}

impl BrokerInner {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // State is only touched in short non-panicking sections.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, message: StoredMessage) {
        self.lock().ready.push_back(message);
        self.notify.notify_one();
    }

    fn receive(&self) -> Option<Delivery> {
        let mut state = self.lock();

        if state.unacked.len() >= usize::from(PREFETCH_COUNT) {
            return None;
        }

        let message = state.ready.pop_front()?;
        state.next_tag += 1;
        let delivery_tag = state.next_tag;
        state.unacked.insert(delivery_tag, message.clone());

        Some(Delivery {
            delivery_tag,
            body: message.body,
            retries: message.retries,
            redelivered: message.redelivered,
        })
    }

    fn is_drained(&self) -> bool {
        let state = self.lock();
        state.ready.is_empty() && state.unacked.is_empty()
    }

    fn settle(&self, delivery_tag: u64) -> NotificationResult<StoredMessage> {
        self.lock()
            .unacked
            .remove(&delivery_tag)
            .ok_or_else(|| NotificationError::queue(format!("Unknown delivery tag {}", delivery_tag)))
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    fn queue_name(&self) -> &str {
        &self.inner.queue_name
    }

    async fn publish(&self, message: &QueueMessage) -> NotificationResult<()> {
        if self.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(NotificationError::queue("In-memory broker is refusing publishes"));
        }

        let stored = StoredMessage {
            body: message.to_payload()?,
            retries: Some(message.retries),
            redelivered: false,
        };

        self.inner.lock().published.push(stored.clone());
        self.inner.push(stored);
        Ok(())
    }

    async fn acknowledge(&self, delivery_tag: u64) -> NotificationResult<()> {
        self.inner.settle(delivery_tag)?;
        self.inner.lock().acknowledged.push(delivery_tag);
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn reject(&self, delivery_tag: u64, requeue: bool) -> NotificationResult<()> {
        let message = self.inner.settle(delivery_tag)?;
        {
            let mut state = self.inner.lock();
            state.rejected.push((delivery_tag, requeue));
            if requeue {
                state.ready.push_front(StoredMessage {
                    redelivered: true,
                    ..message
                });
            }
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn subscribe(&self) -> NotificationResult<DeliveryStream> {
        let inner = Arc::clone(&self.inner);

        let deliveries = stream::unfold(inner, |inner| async move {
            loop {
                if let Some(delivery) = inner.receive() {
                    return Some((Ok::<_, NotificationError>(delivery), inner));
                }
                if inner.closed.load(Ordering::SeqCst) && inner.is_drained() {
                    return None;
                }
                inner.notify.notified().await;
            }
        });

        Ok(deliveries.boxed())
    }

    async fn health_check(&self) -> NotificationResult<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditStore {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: CreateAuditRecord) -> NotificationResult<i64> {
        let mut records = self.lock();
        let id = records.len() as i64 + 1;

        records.push(AuditRecord {
            id,
            user_id: record.user_id,
            message: record.message,
            notification_type: record.notification_type.as_str().to_string(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn list_for_user(&self, user_id: i64) -> NotificationResult<Vec<AuditRecord>> {
        Ok(self
            .lock()
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> NotificationResult<()> {
        Ok(())
    }
}
