use anyhow::Context;

use marketplace_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marketplace_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set; login will fail until it is configured");
    }

    let bind_addr = config.server.bind_addr();
    let app = marketplace_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
