use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::warn;

use crate::app::dto::{HealthResponse, WhoAmIResponse};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// 200 when the stores answer, 503 otherwise.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let (status, body) = match services.health().await {
        Ok(()) => (
            StatusCode::OK,
            HealthResponse {
                status: "ok",
                timestamp: Utc::now(),
                database: "connected",
            },
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded",
                    timestamp: Utc::now(),
                    database: "unavailable",
                },
            )
        }
    };
    (status, Json(body))
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(WhoAmIResponse {
        user_id: principal.user_id(),
        email: principal.email().to_string(),
        role: principal.role(),
    })
}
