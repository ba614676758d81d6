use std::sync::Arc;

use url::Url;
use webgraph_batch::{LinkBatcher, PageBatcher};
use webgraph_cache::VisitedCache;
use webgraph_core::{CrawlError, Link, Page};
use webgraph_fetch::LinkExtractor;
use webgraph_queue::DurableQueue;

/// Per-URL pipeline: dedup against the visited cache, submit the
/// source page, fetch and extract its outbound anchors, then fan each
/// extracted link out to the queue and both batchers. Step 4a enqueues
/// only the link's target — the referrer was already dequeued to get
/// here. Generic over `LinkExtractor` so the algorithm is testable
/// without a real fetcher.
pub struct Processor<E: LinkExtractor> {
    visited: Arc<VisitedCache>,
    queue: Arc<DurableQueue>,
    pages: Arc<PageBatcher>,
    links: Arc<LinkBatcher>,
    extractor: Arc<E>,
}

impl<E: LinkExtractor> Processor<E> {
    pub fn new(
        visited: Arc<VisitedCache>,
        queue: Arc<DurableQueue>,
        pages: Arc<PageBatcher>,
        links: Arc<LinkBatcher>,
        extractor: Arc<E>,
    ) -> Self {
        Self {
            visited,
            queue,
            pages,
            links,
            extractor,
        }
    }

    pub async fn process(&self, url: &Url) -> Result<(), CrawlError> {
        let fingerprint = webgraph_url::page_id(url);

        if self.visited.seen(&fingerprint).await {
            return Ok(());
        }
        self.visited.mark(&fingerprint).await;
        self.pages.submit(page_for(url, &fingerprint)).await;

        let extracted = self.extractor.fetch_and_extract(url).await?;

        for item in extracted {
            let to_fingerprint = webgraph_url::page_id(&item.url);

            if !self.visited.seen(&to_fingerprint).await {
                if let Err(err) = self.queue.enqueue(&item.url, &to_fingerprint).await {
                    tracing::warn!(error = %err, url = %item.url, "failed to enqueue extracted link");
                }
                self.pages
                    .submit(page_for(&item.url, &to_fingerprint))
                    .await;
            }

            let link = Link::new(fingerprint.clone(), to_fingerprint, item.text.as_bytes());
            self.links.submit(link).await;
        }

        Ok(())
    }
}

fn page_for(url: &Url, fingerprint: &str) -> Page {
    Page {
        page_id: fingerprint.to_string(),
        host: url.host_str().unwrap_or_default().to_string(),
        path: url.path().to_string(),
        url: url.as_str().to_string(),
    }
}
