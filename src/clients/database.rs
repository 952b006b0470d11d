use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

use crate::{
    error::{NotificationError, NotificationResult},
    models::audit::{AuditRecord, CreateAuditRecord},
};

/// Append-only record of accepted notifications.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: CreateAuditRecord) -> NotificationResult<i64>;

    async fn list_for_user(&self, user_id: i64) -> NotificationResult<Vec<AuditRecord>>;

    async fn health_check(&self) -> NotificationResult<()>;
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        message TEXT NOT NULL,
        type TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS notifications_user_id_idx ON notifications (user_id)";

pub struct DatabaseClient {
    client: Client,
}

impl DatabaseClient {
    pub async fn connect(database_url: &str) -> NotificationResult<Self> {
        info!("Connecting to PostgreSQL database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| NotificationError::audit(format!("Failed to connect to database: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        client
            .batch_execute(CREATE_TABLE)
            .await
            .map_err(|e| NotificationError::audit(format!("Failed to create notifications table: {}", e)))?;

        client
            .batch_execute(CREATE_USER_INDEX)
            .await
            .map_err(|e| NotificationError::audit(format!("Failed to create user index: {}", e)))?;

        info!("PostgreSQL connection established");

        Ok(Self { client })
    }
}

fn record_from_row(row: &Row) -> AuditRecord {
    AuditRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        message: row.get("message"),
        notification_type: row.get("type"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl AuditStore for DatabaseClient {
    async fn append(&self, record: CreateAuditRecord) -> NotificationResult<i64> {
        let notification_type = record.notification_type.as_str();

        let row = self
            .client
            .query_one(
                "INSERT INTO notifications (user_id, message, type) VALUES ($1, $2, $3) RETURNING id",
                &[&record.user_id, &record.message, &notification_type],
            )
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = record.user_id,
                    "Failed to write audit record to database"
                );
                NotificationError::audit(format!("Database write failed: {}", e))
            })?;

        let id: i64 = row.get("id");

        debug!(id, user_id = record.user_id, notification_type, "Audit record written");

        Ok(id)
    }

    async fn list_for_user(&self, user_id: i64) -> NotificationResult<Vec<AuditRecord>> {
        let rows = self
            .client
            .query(
                "SELECT id, user_id, message, type, created_at FROM notifications WHERE user_id = $1 ORDER BY id",
                &[&user_id],
            )
            .await
            .map_err(|e| NotificationError::audit(format!("Database query failed: {}", e)))?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn health_check(&self) -> NotificationResult<()> {
        self.client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| NotificationError::audit(format!("Database health check failed: {}", e)))?;

        Ok(())
    }
}
