use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use marketplace_core::ProductId;
use marketplace_products::NewProduct;

use crate::app::dto::{CreateProductRequest, ListProductsQuery, UpdateProductRequest};
use crate::app::errors::{self, bad_request, domain_error_to_response};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/code/:code", get(get_product_by_code))
        .route("/:id", get(get_product).patch(update_product).delete(delete_product))
}

fn parse_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };

    let new_product = NewProduct {
        code: body.code,
        name: body.name,
        description: body.description,
        price: body.price,
        status: body.status.unwrap_or_default(),
        user_id: body.user_id.unwrap_or(principal.user_id()),
    };

    match services.products.create_product(new_product).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return bad_request(e.body_text()),
    };

    let (filter, page) = query.into_parts();
    match services.products.list_products(Some(filter), Some(page)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.products.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn get_product_by_code(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match services.products.get_product_by_code(&code).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e.body_text()),
    };

    match services.products.update_product(id, body.into()).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => domain_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.products.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => domain_error_to_response(e),
    }
}
