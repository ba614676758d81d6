use async_trait::async_trait;
use webgraph_core::{Link, Page};
use webgraph_storage::Storage;

/// Narrow seam over `Storage` so the resilient-insert algorithm and
/// the batch workers can be exercised against an in-memory fake
/// without a live Postgres connection.
#[async_trait]
pub trait LinkSink: Send + Sync {
    async fn insert_links(&self, links: &[Link]) -> Result<(), sqlx::Error>;
    fn is_foreign_key_violation(&self, err: &sqlx::Error) -> bool;
}

#[async_trait]
pub trait PageSink: Send + Sync {
    async fn insert_pages(&self, pages: &[Page]) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl LinkSink for Storage {
    async fn insert_links(&self, links: &[Link]) -> Result<(), sqlx::Error> {
        self.batch_insert_links(links).await
    }

    fn is_foreign_key_violation(&self, err: &sqlx::Error) -> bool {
        Storage::is_foreign_key_violation(err)
    }
}

#[async_trait]
impl PageSink for Storage {
    async fn insert_pages(&self, pages: &[Page]) -> Result<(), sqlx::Error> {
        self.batch_insert_pages(pages).await
    }
}
