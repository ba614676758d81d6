use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "webgraph", about = "Distributed web crawler building a link graph")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start crawling from seed URLs
    Crawl {
        /// Seed URLs (comma-separated) or a path to a file with one URL per line
        #[arg(short, long)]
        seeds: Option<String>,

        /// Single seed URL
        #[arg(long)]
        seed: Option<String>,
    },
    /// Serve the read-only HTTP API
    Serve,
    /// Print queue depth and database counts
    Status,
}
