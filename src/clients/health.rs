use std::{collections::HashMap, future::Future, sync::Arc, time::Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{broker::MessageBroker, database::AuditStore},
    error::NotificationResult,
    models::health::{HealthCheckResponse, HealthStatus, ServiceHealth},
};

pub struct HealthChecker {
    broker: Arc<dyn MessageBroker>,
    store: Arc<dyn AuditStore>,
}

impl HealthChecker {
    pub fn new(broker: Arc<dyn MessageBroker>, store: Arc<dyn AuditStore>) -> Self {
        Self { broker, store }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let db_health = timed("database", self.store.health_check()).await;
        checks.insert("database".to_string(), db_health);

        let broker_health = timed("message_broker", self.broker.health_check()).await;
        checks.insert("message_broker".to_string(), broker_health);

        let overall_status = if checks
            .values()
            .any(|health| health.status == HealthStatus::Unhealthy)
        {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResponse {
            status: overall_status,
            timestamp: Utc::now(),
            checks,
        }
    }
}

async fn timed<F>(service: &str, check: F) -> ServiceHealth
where
    F: Future<Output = NotificationResult<()>>,
{
    let start = Instant::now();

    match check.await {
        Ok(()) => {
            let elapsed = start.elapsed().as_millis() as u64;
            debug!(service, response_time_ms = elapsed, "Health check passed");
            ServiceHealth::healthy(elapsed)
        }
        Err(e) => {
            warn!(service, error = %e, "Health check failed");
            ServiceHealth::unhealthy(e.to_string())
        }
    }
}
