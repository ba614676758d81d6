mod cli;
mod crawl;
mod seeds;
mod serve;
mod status;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc avoids glibc malloc's reluctance to release memory back to the
// OS under the batcher/queue workload's high churn of small allocations.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use webgraph_core::AppConfig;

use crate::cli::{Cli, Commands};
use crate::crawl::run_crawl;
use crate::serve::run_serve;
use crate::status::run_status;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(32)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(512)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config = AppConfig::load(&config_str)?;

    match cli.command {
        Commands::Crawl { seeds, seed } => run_crawl(config, seeds, seed).await?,
        Commands::Serve => run_serve(config).await?,
        Commands::Status => run_status(config).await?,
    }

    Ok(())
}
