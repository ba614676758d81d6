use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use webgraph_core::{Link, Page};

/// Postgres-backed store for the two-table crawl graph. All mutating
/// operations are idempotent on their primary keys; the connection
/// pool is the only serialization point.
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    /// Creates `pages`/`links` plus their indexes if absent.
    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// `INSERT ... ON CONFLICT DO NOTHING` in one round trip via
    /// `UNNEST`, rather than one statement per row.
    pub async fn batch_insert_pages(&self, pages: &[Page]) -> Result<(), sqlx::Error> {
        if pages.is_empty() {
            return Ok(());
        }
        let page_ids: Vec<&str> = pages.iter().map(|p| p.page_id.as_str()).collect();
        let hosts: Vec<&str> = pages.iter().map(|p| p.host.as_str()).collect();
        let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();

        sqlx::query(
            "INSERT INTO pages (page_id, host, path, url)
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[])
             ON CONFLICT (page_id) DO NOTHING",
        )
        .bind(&page_ids[..])
        .bind(&hosts[..])
        .bind(&paths[..])
        .bind(&urls[..])
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Same pattern against `links`. Callers own the foreign-key-aware
    /// retry loop (see `webgraph_batch::link`) — this just executes
    /// the batch and surfaces whatever error Postgres returns.
    pub async fn batch_insert_links(&self, links: &[Link]) -> Result<(), sqlx::Error> {
        if links.is_empty() {
            return Ok(());
        }
        let froms: Vec<&str> = links.iter().map(|l| l.from_page_id.as_str()).collect();
        let tos: Vec<&str> = links.iter().map(|l| l.to_page_id.as_str()).collect();
        let texts: Vec<&str> = links.iter().map(|l| l.text.as_str()).collect();

        sqlx::query(
            "INSERT INTO links (from_page_id, to_page_id, text)
             SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[])
             ON CONFLICT (from_page_id, to_page_id) DO NOTHING",
        )
        .bind(&froms[..])
        .bind(&tos[..])
        .bind(&texts[..])
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `true` if `err` is a Postgres foreign-key violation
    /// (SQLSTATE 23503) — the signal the resilient insert loop uses to
    /// tell "retry, the page is still in flight" from "poison row."
    pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|e| e.code())
            .map(|code| code == "23503")
            .unwrap_or(false)
    }

    pub async fn get_page(&self, page_id: &str) -> Result<Option<Page>, sqlx::Error> {
        sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT page_id, host, path, url FROM pages WHERE page_id = $1",
        )
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| {
            row.map(|(page_id, host, path, url)| Page {
                page_id,
                host,
                path,
                url,
            })
        })
    }

    pub async fn page_ids_by_host(&self, host: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT page_id FROM pages WHERE host = $1 LIMIT $2")
                .bind(host)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn links_from(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT to_page_id FROM links WHERE from_page_id = $1 LIMIT $2")
                .bind(page_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn links_to(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT from_page_id FROM links WHERE to_page_id = $1 LIMIT $2")
                .bind(page_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Approximate row count via planner statistics, matching the
    /// original read API — exact `COUNT(*)` is a full scan on tables
    /// this large.
    pub async fn count_pages(&self) -> Result<i64, sqlx::Error> {
        approximate_count(&self.pool, "pages").await
    }

    pub async fn count_links(&self) -> Result<i64, sqlx::Error> {
        approximate_count(&self.pool, "links").await
    }
}

async fn approximate_count(pool: &PgPool, table: &str) -> Result<i64, sqlx::Error> {
    let row: Option<(f32,)> = sqlx::query_as("SELECT reltuples FROM pg_class WHERE relname = $1")
        .bind(table)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(reltuples,)| reltuples.max(0.0) as i64).unwrap_or(0))
}
