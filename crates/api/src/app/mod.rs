//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use marketplace_auth::AccessPolicy;
use marketplace_infra::AppConfig;

use crate::{authz, middleware};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let timeout = Duration::from_secs(config.server.timeout_secs);
    let services = Arc::new(services::build_services(&config).await?);
    Ok(router(services, timeout))
}

/// Route tree over already-built services.
pub fn router(services: Arc<AppServices>, timeout: Duration) -> Router {
    let auth_state = middleware::AuthState {
        credentials: services.credentials.clone(),
    };

    let admin = routes::users::router().route_layer(axum::middleware::from_fn_with_state(
        AccessPolicy::admin_only(),
        authz::require_policy,
    ));

    // Protected routes: require a valid bearer token.
    let protected = Router::new()
        .route("/whoami", get(routes::system::whoami))
        .nest("/users", admin)
        .nest("/products", routes::products::router())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", public.merge(protected))
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        )
}
