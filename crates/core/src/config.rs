use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Number of URL-processor workers pulling from the durable queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Flush batch size for both the page and link batchers.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of flush workers per batcher.
    #[serde(default = "default_batch_workers")]
    pub batch_workers: usize,
    #[serde(default = "default_max_body_mb")]
    pub max_body_size_mb: usize,
    /// How often the dispatcher logs queue depth, in seconds.
    #[serde(default = "default_tick_secs")]
    pub stats_tick_secs: u64,
}

fn default_workers() -> usize {
    2
}
fn default_batch_size() -> usize {
    100
}
fn default_batch_workers() -> usize {
    4
}
fn default_max_body_mb() -> usize {
    10
}
fn default_tick_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Falls back to POSTGRES_USER/POSTGRES_PASSWORD/POSTGRES_HOST/
    /// POSTGRES_DB env vars when absent (see `AppConfig::load`).
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

fn default_pool_size() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Falls back to QUEUE_DATA env var when absent.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

fn default_dedup_capacity() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_visited_ttl_hours")]
    pub visited_ttl_hours: u64,
    #[serde(default = "default_page_dedup_capacity")]
    pub page_dedup_capacity: usize,
}

fn default_visited_ttl_hours() -> u64 {
    48
}
fn default_page_dedup_capacity() -> usize {
    100_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl AppConfig {
    /// Parses a TOML config and layers the `spec`-mandated environment
    /// variables on top, matching the teacher's own env-override
    /// precedent in its runtime entrypoint.
    pub fn load(raw: &str) -> anyhow::Result<Self> {
        let mut config: AppConfig = toml::from_str(raw)?;

        if let Ok(dir) = std::env::var("QUEUE_DATA") {
            config.queue.data_dir = Some(dir);
        }

        if let (Ok(user), Ok(password), Ok(host), Ok(db)) = (
            std::env::var("POSTGRES_USER"),
            std::env::var("POSTGRES_PASSWORD"),
            std::env::var("POSTGRES_HOST"),
            std::env::var("POSTGRES_DB"),
        ) {
            config.database.postgres_url = Some(format!(
                "postgres://{user}:{password}@{host}/{db}"
            ));
        }

        Ok(config)
    }
}
