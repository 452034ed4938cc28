use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use marketplace_core::UserId;
use marketplace_users::{NewUser, UserChanges};

use crate::app::dto::{CreateUserRequest, ListUsersQuery, UpdateUserRequest};
use crate::app::errors::{self, bad_request, domain_error_to_response};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

fn parse_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
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

    let new_user = NewUser::new(body.email, body.name, password_hash).with_role(body.role.unwrap_or_default());
    match services.users.create_user(new_user).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return bad_request(e.body_text()),
    };

    let (filter, page) = query.into_parts();
    match services.users.list_users(Some(filter), Some(page)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.users.get_user(id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };

    let password_hash = match body.password {
        None => None,
        Some(password) => {
            if let Err(e) = services.users.validation().validate_password(&password) {
                return domain_error_to_response(e);
            }
            match services.hash_password(password).await {
                Ok(h) => Some(h),
                Err(e) => return domain_error_to_response(e),
            }
        }
    };

    let changes = UserChanges {
        name: body.name,
        email: body.email,
        password_hash,
        role: body.role,
    };
    match services.users.update_user(id, changes).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.users.delete_user(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => domain_error_to_response(e),
    }
}
