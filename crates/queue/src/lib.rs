use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex as StdMutex;

use lru::LruCache;
use queue_file::QueueFile;
use tokio::sync::Notify;
use tokio::task;
use url::Url;

/// Persistent, crash-safe FIFO of pending URLs plus a bounded LRU gate
/// that keeps the same fingerprint from being pushed twice in short
/// succession. Single-process; internally serialized so concurrent
/// `enqueue`/`dequeue` from multiple tasks are safe.
pub struct DurableQueue {
    file: StdMutex<QueueFile>,
    dedup: StdMutex<LruCache<String, ()>>,
    notify: Notify,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("queue file error: {0}")]
    QueueFile(String),
}

impl DurableQueue {
    pub fn open(data_dir: &Path, dedup_capacity: usize) -> Result<Self, QueueError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("queue.dat");
        let file = QueueFile::open(&path).map_err(|e| QueueError::QueueFile(e.to_string()))?;
        let capacity = NonZeroUsize::new(dedup_capacity.max(1)).unwrap();
        Ok(Self {
            file: StdMutex::new(file),
            dedup: StdMutex::new(LruCache::new(capacity)),
            notify: Notify::new(),
        })
    }

    /// Appends `url` to disk unless its fingerprint was pushed recently.
    /// Returns `false` when the push was dropped as a near-duplicate.
    pub async fn enqueue(&self, url: &Url, fingerprint: &str) -> Result<bool, QueueError> {
        {
            let mut dedup = self.dedup.lock().unwrap();
            if dedup.put(fingerprint.to_string(), ()).is_some() {
                return Ok(false);
            }
        }

        let bytes = url.as_str().as_bytes().to_vec();
        self.with_file_blocking(move |file| file.add(&bytes)).await?;
        self.notify.notify_one();
        Ok(true)
    }

    /// Blocks (asynchronously) until a URL is available, then returns
    /// it. Unparseable entries are logged and skipped, not returned.
    pub async fn dequeue(&self) -> Url {
        loop {
            let next = self
                .with_file_blocking(|file| {
                    let item = file.peek().map(|bytes| bytes.to_vec());
                    if item.is_some() {
                        let _ = file.remove();
                    }
                    item
                })
                .await
                .ok()
                .flatten();

            match next {
                Some(bytes) => match std::str::from_utf8(&bytes).ok().and_then(|s| Url::parse(s).ok()) {
                    Some(url) => return url,
                    None => {
                        tracing::warn!("durable queue: dropping unparseable entry");
                        continue;
                    }
                },
                None => {
                    self.notify.notified().await;
                }
            }
        }
    }

    pub async fn length(&self) -> u64 {
        self.with_file_blocking(|file| file.len() as u64)
            .await
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.length().await == 0
    }

    /// Flushes pending writes. The queue file itself has no explicit
    /// close; dropping it is sufficient, this exists for symmetry with
    /// the lifecycle coordinator's shutdown stages.
    pub async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn with_file_blocking<T, F>(&self, f: F) -> Result<T, QueueError>
    where
        F: FnOnce(&mut QueueFile) -> T + Send + 'static,
        T: Send + 'static,
    {
        // queue-file does blocking disk I/O. block_in_place hands this
        // worker thread's other tasks off to the pool for the
        // duration, matching the original's single coarse RWMutex
        // around its own store.
        let mut guard = self.file.lock().unwrap();
        let result = task::block_in_place(|| f(&mut guard));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn enqueue_then_dequeue_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DurableQueue::open(dir.path(), 10_000).unwrap();
        let url = Url::parse("https://a.example/p").unwrap();
        assert!(queue.enqueue(&url, "fp1").await.unwrap());
        let out = queue.dequeue().await;
        assert_eq!(out, url);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_fingerprint_within_dedup_window_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let queue = DurableQueue::open(dir.path(), 10_000).unwrap();
        let url = Url::parse("https://a.example/p").unwrap();
        assert!(queue.enqueue(&url, "fp1").await.unwrap());
        assert!(!queue.enqueue(&url, "fp1").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn survives_process_restart() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse("https://a.example/p").unwrap();
        {
            let queue = DurableQueue::open(dir.path(), 10_000).unwrap();
            queue.enqueue(&url, "fp1").await.unwrap();
        }
        let queue = DurableQueue::open(dir.path(), 10_000).unwrap();
        let out = queue.dequeue().await;
        assert_eq!(out, url);
    }
}
