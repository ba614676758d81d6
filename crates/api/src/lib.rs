use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use webgraph_core::Page;
use webgraph_storage::Storage;

const QUERY_LIMIT: i64 = 100;

/// Narrow seam over `Storage`'s read helpers so the routes can be
/// exercised against an in-memory fake instead of a live Postgres
/// connection.
#[async_trait]
pub trait ReadStore: Send + Sync + 'static {
    async fn get_page(&self, page_id: &str) -> Result<Option<Page>, sqlx::Error>;
    async fn page_ids_by_host(&self, host: &str, limit: i64) -> Result<Vec<String>, sqlx::Error>;
    async fn links_from(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error>;
    async fn links_to(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error>;
    async fn count_pages(&self) -> Result<i64, sqlx::Error>;
    async fn count_links(&self) -> Result<i64, sqlx::Error>;
}

#[async_trait]
impl ReadStore for Storage {
    async fn get_page(&self, page_id: &str) -> Result<Option<Page>, sqlx::Error> {
        Storage::get_page(self, page_id).await
    }
    async fn page_ids_by_host(&self, host: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        Storage::page_ids_by_host(self, host, limit).await
    }
    async fn links_from(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        Storage::links_from(self, page_id, limit).await
    }
    async fn links_to(&self, page_id: &str, limit: i64) -> Result<Vec<String>, sqlx::Error> {
        Storage::links_to(self, page_id, limit).await
    }
    async fn count_pages(&self) -> Result<i64, sqlx::Error> {
        Storage::count_pages(self).await
    }
    async fn count_links(&self) -> Result<i64, sqlx::Error> {
        Storage::count_links(self).await
    }
}

#[derive(Debug, Serialize)]
struct Node {
    id: String,
    group: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct PageResponse {
    node: Node,
    links: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: i64,
}

enum ApiError {
    NotFound,
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            ApiError::Storage(err) => {
                tracing::warn!(error = %err, "read API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error").into_response()
            }
        }
    }
}

/// Builds the read-only HTTP surface. Callers are expected to already
/// have run `Storage::init` — this only ever issues reads.
pub fn router<S: ReadStore>(store: Arc<S>) -> Router {
    Router::new()
        .route("/page/:id", get(get_page::<S>))
        .route("/pages/:host", get(pages_by_host::<S>))
        .route("/linksFrom/:id", get(links_from::<S>))
        .route("/linksTo/:id", get(links_to::<S>))
        .route("/countPages", get(count_pages::<S>))
        .route("/countLinks", get(count_links::<S>))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

async fn get_page<S: ReadStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = store.get_page(&id).await?.ok_or(ApiError::NotFound)?;
    let links = store.links_from(&id, QUERY_LIMIT).await?;

    Ok(Json(PageResponse {
        node: Node {
            id: page.page_id,
            group: page.host,
            url: page.url,
        },
        links,
    }))
}

async fn pages_by_host<S: ReadStore>(
    State(store): State<Arc<S>>,
    Path(host): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.page_ids_by_host(&host, QUERY_LIMIT).await?))
}

async fn links_from<S: ReadStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.links_from(&id, QUERY_LIMIT).await?))
}

async fn links_to<S: ReadStore>(
    State(store): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.links_to(&id, QUERY_LIMIT).await?))
}

async fn count_pages<S: ReadStore>(State(store): State<Arc<S>>) -> Result<Json<CountResponse>, ApiError> {
    Ok(Json(CountResponse {
        count: store.count_pages().await?,
    }))
}

async fn count_links<S: ReadStore>(State(store): State<Arc<S>>) -> Result<Json<CountResponse>, ApiError> {
    Ok(Json(CountResponse {
        count: store.count_links().await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeStore {
        pages: HashMap<String, Page>,
        links_from: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl ReadStore for FakeStore {
        async fn get_page(&self, page_id: &str) -> Result<Option<Page>, sqlx::Error> {
            Ok(self.pages.get(page_id).cloned())
        }
        async fn page_ids_by_host(&self, host: &str, _limit: i64) -> Result<Vec<String>, sqlx::Error> {
            Ok(self
                .pages
                .values()
                .filter(|p| p.host == host)
                .map(|p| p.page_id.clone())
                .collect())
        }
        async fn links_from(&self, page_id: &str, _limit: i64) -> Result<Vec<String>, sqlx::Error> {
            Ok(self.links_from.get(page_id).cloned().unwrap_or_default())
        }
        async fn links_to(&self, _page_id: &str, _limit: i64) -> Result<Vec<String>, sqlx::Error> {
            Ok(vec![])
        }
        async fn count_pages(&self) -> Result<i64, sqlx::Error> {
            Ok(self.pages.len() as i64)
        }
        async fn count_links(&self) -> Result<i64, sqlx::Error> {
            Ok(0)
        }
    }

    fn store() -> Arc<FakeStore> {
        let mut pages = HashMap::new();
        pages.insert(
            "p1".to_string(),
            Page {
                page_id: "p1".to_string(),
                host: "a.example".to_string(),
                path: "/".to_string(),
                url: "https://a.example/".to_string(),
            },
        );
        let mut links_from = HashMap::new();
        links_from.insert("p1".to_string(), vec!["p2".to_string()]);
        Arc::new(FakeStore { pages, links_from })
    }

    #[tokio::test]
    async fn get_page_returns_node_and_outgoing_links() {
        let app = router(store());
        let response = app
            .oneshot(Request::get("/page/p1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_page_404s_for_unknown_id() {
        let app = router(store());
        let response = app
            .oneshot(Request::get("/page/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn count_pages_reflects_store_size() {
        let app = router(store());
        let response = app
            .oneshot(Request::get("/countPages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
