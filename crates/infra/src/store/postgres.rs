//! Postgres-backed stores.
//!
//! Soft-deleted rows stay in the tables; every query filters on
//! `deleted_at IS NULL`. Uniqueness of `users.email` and `products.code` holds
//! among active rows only, via partial unique indexes.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | DomainError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound("user")` |
//! | Database (check constraint violation) | `23514` | `Validation` |
//! | anything else | | `Internal` |

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, error, info, instrument};

use marketplace_auth::Role;
use marketplace_core::{DomainError, DomainResult, Pagination, ProductId, UserId};
use marketplace_products::{NewProduct, Product, ProductChanges, ProductFilter, ProductStore};
use marketplace_users::{NewUser, User, UserChanges, UserFilter, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            BIGSERIAL PRIMARY KEY,
        email         TEXT NOT NULL,
        name          TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL DEFAULT 'user',
        deleted_at    TIMESTAMPTZ,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_email_active_key
        ON users (email) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          BIGSERIAL PRIMARY KEY,
        code        TEXT NOT NULL,
        name        TEXT NOT NULL,
        description TEXT,
        price       BIGINT NOT NULL CHECK (price >= 0),
        status      TEXT NOT NULL,
        user_id     BIGINT NOT NULL REFERENCES users (id),
        deleted_at  TIMESTAMPTZ,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS products_code_active_key
        ON products (code) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS products_user_id_idx
        ON products (user_id) WHERE deleted_at IS NULL
    "#,
];

const USER_COLUMNS: &str = "id, email, name, password_hash, role, deleted_at, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, code, name, description, price, status, user_id, deleted_at, created_at, updated_at";

/// Product reads join the owner; a soft-deleted owner leaves the `owner_*` columns NULL.
const PRODUCT_WITH_OWNER: &str = "SELECT p.id, p.code, p.name, p.description, p.price, p.status, p.user_id, \
     p.deleted_at, p.created_at, p.updated_at, \
     u.id AS owner_id, u.email AS owner_email, u.name AS owner_name, \
     u.password_hash AS owner_password_hash, u.role AS owner_role, u.deleted_at AS owner_deleted_at, \
     u.created_at AS owner_created_at, u.updated_at AS owner_updated_at \
     FROM products p LEFT JOIN users u ON u.id = p.user_id AND u.deleted_at IS NULL";

/// Open a connection pool.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Create tables and indexes if they are missing. Safe to run on every start.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("database schema ready");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    user_from_columns(row, "")
}

/// Map user columns named `{prefix}id`, `{prefix}email`, ...
fn user_from_columns(row: &PgRow, prefix: &str) -> Result<User, sqlx::Error> {
    let column = |name: &str| format!("{prefix}{name}");

    let role: String = row.try_get(column("role").as_str())?;
    let role = role
        .parse::<Role>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(User {
        id: UserId::new(row.try_get(column("id").as_str())?),
        email: row.try_get(column("email").as_str())?,
        name: row.try_get(column("name").as_str())?,
        password_hash: row.try_get(column("password_hash").as_str())?,
        role,
        deleted_at: row.try_get(column("deleted_at").as_str())?,
        created_at: row.try_get(column("created_at").as_str())?,
        updated_at: row.try_get(column("updated_at").as_str())?,
    })
}

fn push_user_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(email) = &filter.email {
        builder.push(" AND strpos(email, ").push_bind(email.clone()).push(") > 0");
    }
    if let Some(name) = &filter.name {
        builder.push(" AND strpos(name, ").push_bind(name.clone()).push(") > 0");
    }
}

fn user_count_query(filter: &UserFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_user_filter(&mut query, filter);
    query
}

fn user_list_query(filter: &UserFilter, pagination: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
    push_user_filter(&mut query, filter);
    push_page(&mut query, "id", pagination);
    query
}

fn user_update_query(id: UserId, changes: &UserChanges) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE users SET updated_at = now()");
    if let Some(name) = &changes.name {
        query.push(", name = ").push_bind(name.clone());
    }
    if let Some(email) = &changes.email {
        query.push(", email = ").push_bind(email.clone());
    }
    if let Some(hash) = &changes.password_hash {
        query.push(", password_hash = ").push_bind(hash.clone());
    }
    if let Some(role) = changes.role {
        query.push(", role = ").push_bind(role.as_str());
    }
    query
        .push(" WHERE id = ")
        .push_bind(id.get())
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(USER_COLUMNS);
    query
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn insert(&self, user: NewUser) -> DomainResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, name, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user_by_email", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_user_by_email", e))
    }

    #[instrument(skip(self), fields(row_count), err)]
    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> DomainResult<(Vec<User>, u64)> {
        let total: i64 = user_count_query(filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let rows = user_list_query(filter, pagination)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))?;

        Span::current().record("row_count", users.len());
        Ok((users, total.max(0) as u64))
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: UserId, changes: &UserChanges) -> DomainResult<Option<User>> {
        let row = user_update_query(id, changes)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_user", e))
    }

    #[instrument(skip(self), err)]
    async fn soft_delete(&self, id: UserId) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_user", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> DomainResult<()> {
        ping(&self.pool).await
    }
}

#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a product row. The owner is embedded when the row carries the joined
/// `owner_*` columns and the join matched an active user.
fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let has_owner_columns = row.columns().iter().any(|c| c.name() == "owner_id");
    let owner = if has_owner_columns {
        let owner_id: Option<i64> = row.try_get("owner_id")?;
        match owner_id {
            Some(_) => Some(user_from_columns(row, "owner_")?),
            None => None,
        }
    } else {
        None
    };

    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        status: row.try_get("status")?,
        user_id: UserId::new(row.try_get("user_id")?),
        user: owner,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// Columns are qualified: the list query joins `users`.
fn push_product_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE p.deleted_at IS NULL");
    if let Some(code) = &filter.code {
        builder.push(" AND strpos(p.code, ").push_bind(code.clone()).push(") > 0");
    }
    if let Some(name) = &filter.name {
        builder.push(" AND strpos(p.name, ").push_bind(name.clone()).push(") > 0");
    }
    if let Some(status) = &filter.status {
        builder.push(" AND p.status = ").push_bind(status.clone());
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND p.user_id = ").push_bind(user_id.get());
    }
}

fn product_count_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM products p");
    push_product_filter(&mut query, filter);
    query
}

fn product_list_query(filter: &ProductFilter, pagination: Pagination) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(PRODUCT_WITH_OWNER);
    push_product_filter(&mut query, filter);
    push_page(&mut query, "p.id", pagination);
    query
}

fn product_update_query(id: ProductId, changes: &ProductChanges) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE products SET updated_at = now()");
    if let Some(code) = &changes.code {
        query.push(", code = ").push_bind(code.clone());
    }
    if let Some(name) = &changes.name {
        query.push(", name = ").push_bind(name.clone());
    }
    if let Some(description) = &changes.description {
        query.push(", description = ").push_bind(description.clone());
    }
    if let Some(price) = changes.price {
        query.push(", price = ").push_bind(price);
    }
    if let Some(status) = &changes.status {
        query.push(", status = ").push_bind(status.clone());
    }
    query
        .push(" WHERE id = ")
        .push_bind(id.get())
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(PRODUCT_COLUMNS);
    query
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(skip(self, product), fields(code = %product.code), err)]
    async fn insert(&self, product: NewProduct) -> DomainResult<Product> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (code, name, description, price, status, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.status)
        .bind(product.user_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        product_from_row(&row).map_err(|e| map_sqlx_error("insert_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: ProductId) -> DomainResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "{PRODUCT_WITH_OWNER} WHERE p.id = $1 AND p.deleted_at IS NULL"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_code(&self, code: &str) -> DomainResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "{PRODUCT_WITH_OWNER} WHERE p.code = $1 AND p.deleted_at IS NULL"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product_by_code", e))?;

        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_product_by_code", e))
    }

    #[instrument(skip(self), fields(row_count), err)]
    async fn list(&self, filter: &ProductFilter, pagination: Pagination) -> DomainResult<(Vec<Product>, u64)> {
        let total: i64 = product_count_query(filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let rows = product_list_query(filter, pagination)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Span::current().record("row_count", products.len());
        Ok((products, total.max(0) as u64))
    }

    #[instrument(skip(self), err)]
    async fn count_by_owner(&self, user_id: UserId) -> DomainResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE user_id = $1 AND deleted_at IS NULL")
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("count_products_by_owner", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: ProductId, changes: &ProductChanges) -> DomainResult<Option<Product>> {
        let row = product_update_query(id, changes)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_product", e))
    }

    #[instrument(skip(self), err)]
    async fn soft_delete(&self, id: ProductId) -> DomainResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> DomainResult<()> {
        ping(&self.pool).await
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, order_by: &str, pagination: Pagination) {
    builder
        .push(" ORDER BY ")
        .push(order_by)
        .push(" ASC LIMIT ")
        .push_bind(pagination.limit() as i64)
        .push(" OFFSET ")
        .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));
}

async fn ping(pool: &PgPool) -> DomainResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| map_sqlx_error("ping", e))
}

/// Map an sqlx error onto the domain error model.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some("23505") => match db_err.constraint() {
                    Some("users_email_active_key") => DomainError::conflict("email already exists"),
                    Some("products_code_active_key") => DomainError::conflict("product code already exists"),
                    _ => DomainError::conflict(db_err.message().to_string()),
                },
                Some("23503") => DomainError::not_found("user"),
                Some("23514") => DomainError::validation(db_err.message().to_string()),
                _ => {
                    error!(operation, error = %db_err, "database error");
                    DomainError::internal(format!("database error in {operation}"))
                }
            }
        }
        sqlx::Error::PoolClosed => DomainError::internal(format!("connection pool closed in {operation}")),
        other => {
            error!(operation, error = %other, "sqlx error");
            DomainError::internal(format!("database error in {operation}"))
        }
    }
}
