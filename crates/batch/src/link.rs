use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use webgraph_core::Link;

use crate::sink::LinkSink;

const FLUSH_TICK: Duration = Duration::from_millis(5);

/// Links reference pages that may not have committed yet — no
/// happens-before between the page and link batchers. `resilient_insert`
/// is what keeps that race from losing data.
const MAX_FK_RETRIES: u32 = 20;

pub struct LinkBatcher {
    tx: mpsc::Sender<Link>,
}

impl LinkBatcher {
    pub fn spawn<S: LinkSink + 'static>(
        sink: Arc<S>,
        n_workers: usize,
        batch_size: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(batch_size * 4);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..n_workers)
            .map(|_| {
                let sink = sink.clone();
                let rx = rx.clone();
                tokio::spawn(worker(sink, rx, batch_size))
            })
            .collect();

        (Self { tx }, handles)
    }

    pub async fn submit(&self, link: Link) -> bool {
        self.tx.send(link).await.is_ok()
    }

    pub async fn drain(&self) {
        while self.tx.capacity() != self.tx.max_capacity() {
            tokio::time::sleep(FLUSH_TICK).await;
        }
    }

    pub fn close(self) {
        drop(self.tx);
    }
}

async fn worker<S: LinkSink>(sink: Arc<S>, rx: Arc<Mutex<mpsc::Receiver<Link>>>, batch_size: usize) {
    loop {
        let first = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(first) = first else {
            return;
        };

        let mut batch = Vec::with_capacity(batch_size);
        batch.push(first);
        {
            let mut rx = rx.lock().await;
            while batch.len() < batch_size {
                match rx.try_recv() {
                    Ok(link) => batch.push(link),
                    Err(_) => break,
                }
            }
        }

        resilient_insert(sink.as_ref(), batch).await;
    }
}

/// Adaptive batch insert: halves the attempt window on an unknown
/// error (isolates the offender in O(log n) calls), and on a
/// foreign-key violation at window size 1 retries the single link
/// with linear backoff up to `MAX_FK_RETRIES` before giving up on it.
/// A persistent unknown error at size 1 is a poison row — skipped so
/// it never stalls the rest of the batch.
pub async fn resilient_insert<S: LinkSink + ?Sized>(sink: &S, mut remaining: Vec<Link>) {
    let mut size = remaining.len();
    let mut retry_count: u32 = 0;

    while !remaining.is_empty() {
        let result = sink.insert_links(&remaining[..size]).await;

        match result {
            Ok(()) => {
                remaining.drain(..size);
                size = remaining.len();
                retry_count = 0;
            }
            Err(err) => {
                if size == 1 && sink.is_foreign_key_violation(&err) {
                    retry_count += 1;
                    if retry_count > MAX_FK_RETRIES {
                        tracing::warn!(
                            retries = retry_count - 1,
                            "gave up on link after repeated FK violations, skipping"
                        );
                        remaining.remove(0);
                        size = remaining.len();
                        retry_count = 0;
                        continue;
                    }
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(retry_count))).await;
                    continue;
                }

                if size > 1 {
                    size /= 2;
                    continue;
                }

                tracing::warn!(error = %err, "skipping failed link message");
                remaining.remove(0);
                size = remaining.len();
                retry_count = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// In-memory stand-in for `Storage`: `poison` fails forever with an
    /// unknown error, `fk_until` simulates a page that commits after N
    /// attempts (foreign-key violation until then).
    #[derive(Default)]
    struct FakeSink {
        committed: StdMutex<Vec<Link>>,
        poison_texts: HashSet<String>,
        fk_pending: StdMutex<std::collections::HashMap<String, u32>>,
    }

    fn fk_error() -> sqlx::Error {
        // sqlx::Error has no public constructor for a db error with a
        // given code outside its own backend; tests key off this
        // sentinel instead and treat Protocol errors as "unknown".
        sqlx::Error::Protocol("simulated foreign key violation".into())
    }

    fn unknown_error() -> sqlx::Error {
        sqlx::Error::Protocol("simulated unknown error".into())
    }

    #[async_trait]
    impl LinkSink for FakeSink {
        async fn insert_links(&self, links: &[Link]) -> Result<(), sqlx::Error> {
            if links.len() == 1 {
                let link = &links[0];
                if self.poison_texts.contains(&link.text) {
                    return Err(unknown_error());
                }
                let mut pending = self.fk_pending.lock().unwrap();
                if let Some(remaining) = pending.get_mut(&link.to_page_id) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(fk_error());
                    }
                }
            } else if links.iter().any(|l| self.poison_texts.contains(&l.text)) {
                return Err(unknown_error());
            }
            self.committed.lock().unwrap().extend(links.iter().cloned());
            Ok(())
        }

        fn is_foreign_key_violation(&self, err: &sqlx::Error) -> bool {
            matches!(err, sqlx::Error::Protocol(msg) if msg.contains("foreign key"))
        }
    }

    fn link(from: &str, to: &str, text: &str) -> Link {
        Link::new(from.to_string(), to.to_string(), text.as_bytes())
    }

    #[tokio::test]
    async fn empty_batch_never_calls_storage() {
        let sink = FakeSink::default();
        resilient_insert(&sink, vec![]).await;
        assert!(sink.committed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_item_fk_violation_resolves_after_retries_with_no_duplicate() {
        let sink = FakeSink {
            fk_pending: StdMutex::new(std::collections::HashMap::from([("b".to_string(), 3)])),
            ..Default::default()
        };
        resilient_insert(&sink, vec![link("a", "b", "B")]).await;
        let committed = sink.committed.lock().unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].to_page_id, "b");
    }

    #[tokio::test]
    async fn batch_of_many_with_one_poison_commits_the_rest() {
        let mut links = Vec::new();
        for i in 0..32 {
            links.push(link("a", &format!("p{i}"), "ok"));
        }
        links[16] = link("a", "poison", "bad");

        let sink = FakeSink {
            poison_texts: HashSet::from(["bad".to_string()]),
            ..Default::default()
        };
        resilient_insert(&sink, links).await;

        let committed = sink.committed.lock().unwrap();
        assert_eq!(committed.len(), 31);
        assert!(committed.iter().all(|l| l.text != "bad"));
    }

    #[test]
    fn max_fk_retries_is_twenty() {
        assert_eq!(MAX_FK_RETRIES, 20);
    }
}
