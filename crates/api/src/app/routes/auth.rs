use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use marketplace_auth::Role;
use marketplace_core::DomainError;
use marketplace_users::NewUser;

use crate::app::dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::app::errors::{self, bad_request, domain_error_to_response};
use crate::app::services::AppServices;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };

    if let Err(e) = services.users.validation().validate_password(&body.password) {
        return domain_error_to_response(e);
    }

    let password_hash = match services.hash_password(body.password).await {
        Ok(h) => h,
        Err(e) => return domain_error_to_response(e),
    };

    let new_user = NewUser::new(body.email, body.name, password_hash).with_role(Role::User);
    match services.users.create_user(new_user).await {
        Ok(user) => {
            info!(user_id = %user.id, "user registered");
            (
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "user registered successfully",
                    user,
                }),
            )
                .into_response()
        }
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };

    let invalid = || errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid credentials");

    let user = match services.users.get_user_by_email(&body.email).await {
        Ok(u) => u,
        Err(DomainError::NotFound(_)) => {
            debug!("login for unknown email");
            return invalid();
        }
        Err(e) => return domain_error_to_response(e),
    };

    match services.verify_password(body.password, user.password_hash.clone()).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(user_id = %user.id, "login with wrong password");
            return invalid();
        }
        Err(e) => return domain_error_to_response(e),
    }

    match services.credentials.issue_token(&user) {
        Ok(token) => (StatusCode::OK, Json(LoginResponse { token })).into_response(),
        Err(e) => domain_error_to_response(e.into()),
    }
}
