use anyhow::Context;

use storewatch_api::app::{self, services::AppServices};
use storewatch_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storewatch_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.database.is_none() {
        tracing::warn!("SM_POSTGRESQL_HOST not set; using in-memory stores");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to connect to Postgres")?;
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
