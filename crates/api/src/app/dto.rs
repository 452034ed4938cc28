use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use marketplace_auth::Role;
use marketplace_core::{PageRequest, UserId};
use marketplace_products::{ProductChanges, ProductFilter};
use marketplace_users::{User, UserFilter};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub status: Option<String>,
    /// Owner; the caller when omitted.
    pub user_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    /// Absent keeps the description, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub status: Option<String>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            code: req.code,
            name: req.name,
            description: req.description,
            price: req.price,
            status: req.status,
        }
    }
}

/// Present-but-null becomes `Some(None)`; `#[serde(default)]` covers absent.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl ListUsersQuery {
    pub fn into_parts(self) -> (UserFilter, PageRequest) {
        (
            UserFilter {
                email: self.email,
                name: self.name,
            },
            PageRequest {
                page: self.page,
                page_size: self.page_size,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub user_id: Option<UserId>,
}

impl ListProductsQuery {
    pub fn into_parts(self) -> (ProductFilter, PageRequest) {
        (
            ProductFilter {
                code: self.code,
                name: self.name,
                status: self.status,
                user_id: self.user_id,
            },
            PageRequest {
                page: self.page,
                page_size: self.page_size,
            },
        )
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(body: &str) -> ProductChanges {
        serde_json::from_str::<UpdateProductRequest>(body).unwrap().into()
    }

    #[test]
    fn description_distinguishes_absent_null_and_value() {
        assert_eq!(changes(r#"{"name":"x"}"#).description, None);
        assert_eq!(changes(r#"{"description":null}"#).description, Some(None));
        assert_eq!(changes(r#"{"description":"blue"}"#).description, Some(Some("blue".into())));
    }
}
