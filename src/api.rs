use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    clients::health::HealthChecker,
    error::NotificationError,
    intake::NotificationIntake,
    models::{health::HealthStatus, notification::NotificationRequest, response::ApiResponse},
};

pub struct AppState {
    pub intake: NotificationIntake,
    pub health_checker: HealthChecker,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/notifications", post(send_notification))
        .route("/users/{user_id}/notifications", get(list_notifications))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(
    state: Arc<AppState>,
    server_port: u16,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let app = router(state);

    let addr = format!("0.0.0.0:{}", server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NotificationError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid notification type"),
            NotificationError::QueueUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to enqueue notification")
            }
            NotificationError::AuditStore(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save notification")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (
            status,
            Json(ApiResponse::<()>::error(self.to_string(), message.to_string())),
        )
            .into_response()
    }
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NotificationRequest>,
) -> Result<impl IntoResponse, NotificationError> {
    let handle = state.intake.submit(request).await?;

    Ok(Json(ApiResponse::success(
        handle,
        "Notification saved and queued".to_string(),
    )))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, NotificationError> {
    let records = state.intake.history(user_id).await?;

    Ok(Json(ApiResponse::success(
        records,
        "Notifications retrieved".to_string(),
    )))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}
