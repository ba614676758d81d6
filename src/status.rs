use anyhow::Result;
use tracing::info;
use webgraph_core::AppConfig;
use webgraph_queue::DurableQueue;
use webgraph_storage::Storage;

/// Logs queue depth and approximate page/link counts, then exits.
/// The distributed original shipped this as a standalone
/// queue-printing utility; folded in here as a CLI subcommand.
pub async fn run_status(config: AppConfig) -> Result<()> {
    if let Some(dir) = &config.queue.data_dir {
        let queue = DurableQueue::open(std::path::Path::new(dir), config.queue.dedup_capacity)?;
        info!(queue_depth = queue.length().await, "queue depth");
    } else {
        info!("queue depth: unknown (no queue data directory configured)");
    }

    if let Some(database_url) = &config.database.postgres_url {
        let storage = Storage::connect(database_url, config.database.max_connections).await?;
        info!(pages = storage.count_pages().await?, "approximate page count");
        info!(links = storage.count_links().await?, "approximate link count");
        storage.close().await;
    } else {
        info!("pages/links: unknown (no database configured)");
    }

    Ok(())
}
