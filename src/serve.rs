use anyhow::Result;
use tracing::info;
use webgraph_core::AppConfig;
use webgraph_storage::Storage;

/// Runs the read-only HTTP API until the process is killed.
pub async fn run_serve(config: AppConfig) -> Result<()> {
    let database_url = config
        .database
        .postgres_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no database configured: set [database].postgres_url or POSTGRES_* env vars"))?;
    let storage = std::sync::Arc::new(Storage::connect(&database_url, config.database.max_connections).await?);

    let app = webgraph_api::router(storage);
    let listener = tokio::net::TcpListener::bind(&config.api.bind_addr).await?;
    info!(addr = %config.api.bind_addr, "read API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
