use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use notification_service::{
    clients::{broker::MessageBroker, channels::DeliveryChannel, memory::InMemoryBroker},
    dispatcher::ChannelDispatcher,
    models::retry::RetryPolicy,
    worker::QueueConsumer,
};
use tokio_util::sync::CancellationToken;

/// Channel double that records every call and fails a configurable number
/// of times before succeeding.
pub struct RecordingChannel {
    name: &'static str,
    failures_left: AtomicU32,
    calls: Mutex<Vec<(i64, String)>>,
}

impl RecordingChannel {
    pub fn succeeding(name: &'static str) -> Arc<Self> {
        Self::failing_times(name, 0)
    }

    pub fn always_failing(name: &'static str) -> Arc<Self> {
        Self::failing_times(name, u32::MAX)
    }

    pub fn failing_times(name: &'static str, times: u32) -> Arc<Self> {
        Arc::new(Self {
            name,
            failures_left: AtomicU32::new(times),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(i64, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, user_id: i64, message: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push((user_id, message.to_string()));

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();

        if should_fail {
            Err(anyhow!("{} channel unavailable", self.name))
        } else {
            Ok(())
        }
    }
}

/// Channel double that fires a shutdown token from inside `deliver`, as a
/// ctrl-c arriving mid-message would.
pub struct CancellingChannel {
    shutdown: CancellationToken,
    fail: bool,
    calls: AtomicU32,
}

impl CancellingChannel {
    pub fn new(shutdown: CancellationToken, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            shutdown,
            fail,
            calls: AtomicU32::new(0),
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryChannel for CancellingChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, _user_id: i64, _message: &str) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.shutdown.cancel();

        if self.fail {
            Err(anyhow!("email channel unavailable"))
        } else {
            Ok(())
        }
    }
}

pub struct Harness {
    pub broker: InMemoryBroker,
    pub email: Arc<RecordingChannel>,
    pub sms: Arc<RecordingChannel>,
    pub in_app: Arc<RecordingChannel>,
    pub consumer: QueueConsumer,
}

impl Harness {
    pub fn new(
        email: Arc<RecordingChannel>,
        sms: Arc<RecordingChannel>,
        in_app: Arc<RecordingChannel>,
        max_retries: u32,
    ) -> Self {
        let broker = InMemoryBroker::new("notifications");
        let dispatcher = ChannelDispatcher::new(email.clone(), sms.clone(), in_app.clone());
        let consumer = QueueConsumer::new(
            Arc::new(broker.clone()) as Arc<dyn MessageBroker>,
            dispatcher,
            RetryPolicy::new(max_retries),
        );

        Self {
            broker,
            email,
            sms,
            in_app,
            consumer,
        }
    }

    pub fn healthy(max_retries: u32) -> Self {
        Self::new(
            RecordingChannel::succeeding("email"),
            RecordingChannel::succeeding("sms"),
            RecordingChannel::succeeding("in_app"),
            max_retries,
        )
    }

    pub fn total_dispatches(&self) -> usize {
        self.email.call_count() + self.sms.call_count() + self.in_app.call_count()
    }
}

pub fn dispatcher_with(
    email: Arc<RecordingChannel>,
    sms: Arc<RecordingChannel>,
    in_app: Arc<RecordingChannel>,
) -> ChannelDispatcher {
    ChannelDispatcher::new(email, sms, in_app)
}

pub fn body(user_id: i64, message: &str, notification_type: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "user_id": user_id,
        "message": message,
        "type": notification_type,
    }))
    .unwrap()
}
