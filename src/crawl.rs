use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};
use url::Url;

use webgraph_batch::{LinkBatcher, PageBatcher};
use webgraph_cache::VisitedCache;
use webgraph_core::AppConfig;
use webgraph_fetch::Fetcher;
use webgraph_processor::Processor;
use webgraph_queue::DurableQueue;
use webgraph_storage::Storage;

use crate::seeds::DEFAULT_SEEDS;

/// Waits for SIGINT, SIGTERM, or (unix-only) SIGHUP — whichever comes
/// first. The teacher only awaits `ctrl_c()`; this adds the other two
/// since nothing short of them should be treated as "keep running."
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        let mut sighup = signal::unix::signal(signal::unix::SignalKind::hangup())
            .expect("failed to install SIGHUP handler");
        tokio::select! {
            _ = signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sighup.recv() => info!("received SIGHUP"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("received shutdown signal");
    }
}

/// Resolves the seed list: explicit `--seed`, then `--seeds` (a file
/// path or comma-separated list), falling back to the built-in
/// default seed set when neither is given.
fn collect_seed_urls(seeds: Option<String>, seed: Option<String>) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    if let Some(s) = seed {
        urls.push(s);
    }
    if let Some(seeds_arg) = seeds {
        if std::path::Path::new(&seeds_arg).exists() {
            let content = std::fs::read_to_string(&seeds_arg)?;
            urls.extend(
                content
                    .lines()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty()),
            );
        } else {
            urls.extend(seeds_arg.split(',').map(|s| s.trim().to_string()));
        }
    }
    if urls.is_empty() {
        info!("no seeds provided, using default seed list");
        urls.extend(DEFAULT_SEEDS.iter().map(|s| s.to_string()));
    }
    Ok(urls)
}

/// Dispatcher (C10) + lifecycle coordinator (C11): pulls URLs off the
/// durable queue, runs each through the processor pipeline, and drains
/// every stage in order on shutdown.
pub async fn run_crawl(config: AppConfig, seeds: Option<String>, seed: Option<String>) -> Result<()> {
    let database_url = config
        .database
        .postgres_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no database configured: set [database].postgres_url or POSTGRES_* env vars"))?;
    let storage = Storage::connect(&database_url, config.database.max_connections).await?;
    storage.init().await?;
    let storage = Arc::new(storage);

    let queue_dir = config
        .queue
        .data_dir
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no queue data directory configured: set [queue].data_dir or QUEUE_DATA"))?;
    let queue = Arc::new(DurableQueue::open(
        std::path::Path::new(&queue_dir),
        config.queue.dedup_capacity,
    )?);

    let visited = Arc::new(VisitedCache::new(Duration::from_secs(
        config.cache.visited_ttl_hours * 3600,
    )));

    let (pages, page_handles) = PageBatcher::spawn(
        storage.clone(),
        config.general.batch_workers,
        config.general.batch_size,
        config.cache.page_dedup_capacity,
    );
    let pages = Arc::new(pages);
    let (links, link_handles) = LinkBatcher::spawn(
        storage.clone(),
        config.general.batch_workers,
        config.general.batch_size,
    );
    let links = Arc::new(links);

    let fetcher = Arc::new(Fetcher::new(config.general.max_body_size_mb * 1024 * 1024)?);
    let processor = Arc::new(Processor::new(
        visited.clone(),
        queue.clone(),
        pages.clone(),
        links.clone(),
        fetcher,
    ));

    let seed_urls = collect_seed_urls(seeds, seed)?;
    for raw in &seed_urls {
        match Url::parse(raw) {
            Ok(url) => {
                let fingerprint = webgraph_url::page_id(&url);
                if let Err(err) = queue.enqueue(&url, &fingerprint).await {
                    warn!(error = %err, url = raw, "failed to enqueue seed");
                }
            }
            Err(err) => warn!(error = %err, url = raw, "skipping unparseable seed"),
        }
    }
    info!(count = seed_urls.len(), "seeds enqueued");

    let (shutdown_tx, _rx) = tokio::sync::broadcast::channel::<()>(1);

    let mut worker_handles = Vec::with_capacity(config.general.workers);
    for worker_id in 0..config.general.workers {
        let queue = queue.clone();
        let processor = processor.clone();
        let mut shutdown = shutdown_tx.subscribe();
        worker_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!(worker_id, "worker shutting down");
                        break;
                    }
                    url = queue.dequeue() => {
                        if let Err(err) = processor.process(&url).await {
                            warn!(worker_id, url = %url, error = %err, "processing failed");
                        }
                    }
                }
            }
        }));
    }

    let stats_handle = {
        let queue = queue.clone();
        let mut shutdown = shutdown_tx.subscribe();
        let tick = Duration::from_secs(config.general.stats_tick_secs);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(tick) => {
                        info!(queue_depth = queue.length().await, "crawl progress");
                    }
                }
            }
        })
    };

    info!(workers = config.general.workers, "crawl running — send SIGINT/SIGTERM/SIGHUP to stop");
    wait_for_shutdown_signal().await;
    info!("shutdown initiated");
    let _ = shutdown_tx.send(());

    // Stage 1: stop dequeuing new work.
    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = stats_handle.await;
    drop(processor); // releases its batcher/queue Arc clones

    // Stage 2: drain and close the page batcher.
    pages.drain().await;
    let pages = Arc::try_unwrap(pages).unwrap_or_else(|_| unreachable!("all worker refs dropped by now"));
    pages.close();
    for handle in page_handles {
        let _ = handle.await;
    }

    // Stage 3: drain and close the link batcher.
    links.drain().await;
    let links = Arc::try_unwrap(links).unwrap_or_else(|_| unreachable!("all worker refs dropped by now"));
    links.close();
    for handle in link_handles {
        let _ = handle.await;
    }

    // Stage 4: close the durable queue.
    if let Err(err) = queue.close().await {
        error!(error = %err, "failed to close durable queue cleanly");
    }

    // Stage 5: close storage.
    storage.close().await;

    info!("shutdown complete");
    Ok(())
}
