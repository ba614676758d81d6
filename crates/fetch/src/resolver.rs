use std::net::SocketAddr;
use std::sync::Arc;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};

/// DNS resolution is a bottleneck and a reliability hazard for a
/// crawler hitting thousands of distinct hosts — a pluggable resolver
/// with its own cache is a design decision, not an afterthought.
/// Resolves over DNS-over-HTTPS with hickory's built-in response
/// cache doing the memoization.
#[derive(Clone)]
pub struct DohResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl DohResolver {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio(
            ResolverConfig::cloudflare_https(),
            ResolverOpts::default(),
        );
        Self {
            inner: Arc::new(resolver),
        }
    }
}

impl Default for DohResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for DohResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.inner.clone();
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let addrs: Addrs = Box::new(
                lookup
                    .into_iter()
                    .map(|ip| SocketAddr::new(ip, 0))
                    .collect::<Vec<_>>()
                    .into_iter(),
            );
            Ok(addrs)
        })
    }
}
