//! Service wiring: pick the store backend, then build the domain services on it.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use marketplace_auth::{CredentialError, CredentialService};
use marketplace_core::{DomainError, DomainResult};
use marketplace_infra::AppConfig;
use marketplace_infra::store::{
    InMemoryProductStore, InMemoryUserStore, PostgresProductStore, PostgresUserStore, ProductStore,
    UserStore, connect, ensure_schema,
};
use marketplace_products::ProductService;
use marketplace_users::UserService;

pub struct AppServices {
    pub users: UserService,
    pub products: ProductService,
    pub credentials: Arc<CredentialService>,
}

impl AppServices {
    pub fn new(
        config: &AppConfig,
        user_store: Arc<dyn UserStore>,
        product_store: Arc<dyn ProductStore>,
    ) -> Result<Self, CredentialError> {
        let credentials = CredentialService::new(config.auth.clone())?;

        Ok(Self {
            users: UserService::new(user_store.clone(), config.pagination, config.validation),
            products: ProductService::new(product_store, user_store, config.pagination, config.rules.clone()),
            credentials: Arc::new(credentials),
        })
    }

    pub fn in_memory(config: &AppConfig) -> Result<Self, CredentialError> {
        let users = Arc::new(InMemoryUserStore::new());
        let products = Arc::new(InMemoryProductStore::with_owners(users.clone()));
        Self::new(config, users, products)
    }

    /// Hash on the blocking pool; Argon2 would otherwise stall an async worker.
    pub async fn hash_password(&self, password: String) -> DomainResult<String> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.hash_password(&password))
            .await
            .map_err(|e| DomainError::internal(format!("password hashing task failed: {e}")))?
            .map_err(DomainError::from)
    }

    pub async fn verify_password(&self, password: String, hash: String) -> DomainResult<bool> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.verify_password(&password, &hash))
            .await
            .map_err(|e| DomainError::internal(format!("password verification task failed: {e}")))
    }

    /// Both stores answer a ping.
    pub async fn health(&self) -> DomainResult<()> {
        self.users.store().ping().await?;
        self.products.store().ping().await
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let Some(url) = config.database.url.as_deref() else {
        info!("DATABASE_URL not set; using in-memory stores");
        return AppServices::in_memory(config).context("failed to build credential service");
    };

    let pool = connect(url, config.database.max_connections)
        .await
        .context("failed to connect to database")?;
    ensure_schema(&pool)
        .await
        .context("failed to bootstrap database schema")?;
    info!(max_connections = config.database.max_connections, "using postgres stores");

    AppServices::new(
        config,
        Arc::new(PostgresUserStore::new(pool.clone())),
        Arc::new(PostgresProductStore::new(pool)),
    )
    .context("failed to build credential service")
}
