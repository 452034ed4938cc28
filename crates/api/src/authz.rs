//! Role gate for route groups.
//!
//! Runs after the auth middleware and checks the request principal against the
//! route's [`AccessPolicy`].

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use marketplace_auth::{AccessPolicy, authorize};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub async fn require_policy(State(policy): State<AccessPolicy>, req: Request, next: Next) -> Response {
    let Some(principal) = req.extensions().get::<PrincipalContext>() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    };

    if let Err(e) = authorize(principal.principal(), &policy) {
        return json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    next.run(req).await
}
