pub mod resolver;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;
use webgraph_core::CrawlError;
use webgraph_url::filter;

use resolver::DohResolver;

/// Seam over `Fetcher` so callers can drive the link-processing
/// algorithm against a fake in tests without making real HTTP calls.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn fetch_and_extract(&self, url: &Url) -> Result<Vec<ExtractedLink>, CrawlError>;
}

/// Exact etiquette string, per the external-interfaces contract — do
/// not change without also changing robots-adjacent expectations on
/// the sites we crawl.
pub const USER_AGENT: &str =
    "WebGraph v0.2 https://github.com/jamesjarvis/web-graph - This bot just follows links ¯\\_(ツ)_/¯";

const ACCEPT_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

#[derive(Debug, Clone)]
pub struct ExtractedLink {
    pub url: Url,
    pub text: String,
}

pub struct Fetcher {
    client: reqwest::Client,
    max_body_size: usize,
}

impl Fetcher {
    pub fn new(max_body_size: usize) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .dns_resolver(Arc::new(DohResolver::new()))
            .build()
            .map_err(|e| CrawlError::Network(e.to_string()))?;
        Ok(Self { client, max_body_size })
    }

    /// Fetches `url`, validates its content type and size, and returns
    /// every accepted `<a href>` resolved against the response's final
    /// URL. Skipped anchors don't fail the call; only network/timeout/
    /// content-type/size problems do.
    pub async fn fetch_and_extract(&self, url: &Url) -> Result<Vec<ExtractedLink>, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(to_crawl_error)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !accepted_content_type(content_type.as_deref()) {
            return Err(CrawlError::Parse(format!(
                "rejected content-type: {content_type:?}"
            )));
        }

        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(to_crawl_error)?;

        if body.len() > self.max_body_size {
            return Err(CrawlError::Parse(format!(
                "body too large: {} bytes exceeds {} byte limit",
                body.len(),
                self.max_body_size
            )));
        }

        let body = String::from_utf8_lossy(&body);
        Ok(extract_links(&body, &final_url))
    }
}

#[async_trait]
impl LinkExtractor for Fetcher {
    async fn fetch_and_extract(&self, url: &Url) -> Result<Vec<ExtractedLink>, CrawlError> {
        Fetcher::fetch_and_extract(self, url).await
    }
}

fn to_crawl_error(err: reqwest::Error) -> CrawlError {
    if err.is_timeout() {
        CrawlError::Timeout(10)
    } else {
        CrawlError::Network(err.to_string())
    }
}

fn accepted_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let top_level = content_type.split(';').next().unwrap_or("").trim();
    ACCEPT_CONTENT_TYPES.contains(&top_level)
}

fn extract_links(body: &str, base_url: &Url) -> Vec<ExtractedLink> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            let resolved = filter::parse(href, Some(base_url)).ok()?;
            if !filter::accept(&resolved) {
                return None;
            }
            let text = el.text().collect::<String>().trim().to_string();
            Some(ExtractedLink {
                url: resolved,
                text,
            })
        })
        .collect()
}
