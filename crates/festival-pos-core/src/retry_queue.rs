// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Offline sale retry queue
//
// Sales whose live post failed are kept in the `salesToRetry` slot and
// redelivered by periodic retry passes. Every operation reads and rewrites
// the whole slot while holding the slot lock, so a pass in one process and
// an enqueue in another cannot overwrite each other.

use crate::sale::{QueuedSale, Sale};
use crate::storage::{lock_slot, read_json, write_json, KeyValueStore};
use crate::transport::SaleTransport;
use crate::types::AppError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage slot holding the queued sales
pub const QUEUE_KEY: &str = "salesToRetry";

/// Failed attempts after which a sale is dropped
pub const MAX_RETRIES: u32 = 10;

/// Outcome counts of one retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub delivered: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// Persisted queue of sales awaiting delivery
pub struct SaleRetryQueue<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S: KeyValueStore + ?Sized> SaleRetryQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_retries: MAX_RETRIES,
        }
    }

    /// Override the ceiling. A ceiling of zero is raised to one so every
    /// queued sale gets at least one retry attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Snapshot of the persisted queue, in enqueue order
    pub fn pending(&self) -> Result<Vec<QueuedSale>, AppError> {
        Ok(read_json(&*self.store, QUEUE_KEY)?.unwrap_or_default())
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.pending()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }

    /// Append a sale for later delivery to `endpoint`
    pub async fn enqueue(&self, sale: Sale, endpoint: &str) -> Result<(), AppError> {
        let _lock = lock_slot(&*self.store, QUEUE_KEY).await?;
        let mut queue = self.pending()?;
        info!(sale_id = %sale.id, endpoint, queued = queue.len() + 1, "Queueing sale for retry");
        queue.push(QueuedSale::new(sale, endpoint));
        write_json(&*self.store, QUEUE_KEY, &queue)
    }

    /// Attempt delivery of every queued sale once, then persist the survivors
    pub async fn retry_all<T>(&self, transport: &T) -> Result<RetryReport, AppError>
    where
        T: SaleTransport + ?Sized,
    {
        // held until the survivors are written back
        let _lock = lock_slot(&*self.store, QUEUE_KEY).await?;
        let queue = self.pending()?;
        let mut report = RetryReport::default();
        if queue.is_empty() {
            debug!("Retry queue empty, nothing to do");
            return Ok(report);
        }

        let mut survivors = Vec::with_capacity(queue.len());
        for mut entry in queue {
            if entry.retry_count >= self.max_retries {
                warn!(
                    sale_id = %entry.sale.id,
                    retries = entry.retry_count,
                    "Dropping sale after exhausting retries"
                );
                report.dropped += 1;
                continue;
            }

            if transport.post_sale(&entry.sale, &entry.api).await {
                info!(sale_id = %entry.sale.id, "Queued sale delivered");
                report.delivered += 1;
            } else {
                entry.retry_count += 1;
                debug!(sale_id = %entry.sale.id, retries = entry.retry_count, "Queued sale still undeliverable");
                report.failed += 1;
                survivors.push(entry);
            }
        }

        write_json(&*self.store, QUEUE_KEY, &survivors)?;
        info!(
            delivered = report.delivered,
            failed = report.failed,
            dropped = report.dropped,
            "Retry pass finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::SaleItem;
    use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const ENDPOINT: &str = "https://vendor/api/pos/sale";

    /// Transport with a fixed answer per sale id, recording every attempt
    struct ScriptedTransport {
        accept: HashSet<String>,
        attempts: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn failing() -> Self {
            Self::accepting(&[])
        }

        fn accepting(ids: &[&str]) -> Self {
            Self {
                accept: ids.iter().map(|s| s.to_string()).collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SaleTransport for ScriptedTransport {
        async fn post_sale(&self, sale: &Sale, _endpoint: &str) -> bool {
            self.attempts.lock().unwrap().push(sale.id.clone());
            self.accept.contains(&sale.id)
        }
    }

    struct AlwaysOk;

    #[async_trait]
    impl SaleTransport for AlwaysOk {
        async fn post_sale(&self, _sale: &Sale, _endpoint: &str) -> bool {
            true
        }
    }

    fn sale(id: &str) -> Sale {
        Sale::with_id(
            id,
            "pos-1",
            Utc::now(),
            vec![SaleItem {
                product_id: "p1".to_string(),
                quantity: 2,
                selling_price: 5.0,
            }],
        )
        .unwrap()
    }

    fn queue() -> (Arc<MemoryKeyValueStore>, SaleRetryQueue<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        (store.clone(), SaleRetryQueue::new(store))
    }

    #[tokio::test]
    async fn test_successful_pass_empties_queue() {
        let (_, queue) = queue();
        queue.enqueue(sale("a"), ENDPOINT).await.unwrap();
        queue.enqueue(sale("b"), ENDPOINT).await.unwrap();

        let report = queue.retry_all(&AlwaysOk).await.unwrap();
        assert_eq!(report.delivered, 2);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_dropped_on_eleventh_pass() {
        let (_, queue) = queue();
        let transport = ScriptedTransport::failing();
        queue.enqueue(sale("s1"), ENDPOINT).await.unwrap();

        for _ in 0..10 {
            queue.retry_all(&transport).await.unwrap();
        }
        let pending = queue.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].retry_count, 10);

        let report = queue.retry_all(&transport).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert!(queue.is_empty().unwrap());
        // the eleventh pass does not attempt delivery
        assert_eq!(transport.attempts().len(), 10);
    }

    #[tokio::test]
    async fn test_enqueue_is_additive_and_ordered() {
        let (_, queue) = queue();
        queue.enqueue(sale("A"), ENDPOINT).await.unwrap();
        queue.enqueue(sale("B"), ENDPOINT).await.unwrap();

        queue.retry_all(&ScriptedTransport::failing()).await.unwrap();

        let pending = queue.pending().unwrap();
        let ids: Vec<&str> = pending.iter().map(|q| q.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(pending.iter().all(|q| q.retry_count == 1));
    }

    #[tokio::test]
    async fn test_success_removes_only_matching_entry() {
        let (_, queue) = queue();
        queue.enqueue(sale("A"), ENDPOINT).await.unwrap();
        queue.enqueue(sale("B"), ENDPOINT).await.unwrap();
        queue.enqueue(sale("C"), ENDPOINT).await.unwrap();
        queue.retry_all(&ScriptedTransport::failing()).await.unwrap();

        let transport = ScriptedTransport::accepting(&["B"]);
        let report = queue.retry_all(&transport).await.unwrap();
        assert_eq!(report, RetryReport { delivered: 1, failed: 2, dropped: 0 });
        assert_eq!(transport.attempts(), vec!["A", "B", "C"]);

        let pending = queue.pending().unwrap();
        let ids: Vec<&str> = pending.iter().map(|q| q.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert!(pending.iter().all(|q| q.retry_count == 2));
    }

    #[tokio::test]
    async fn test_empty_queue_pass_does_not_write() {
        let (store, queue) = queue();
        let report = queue.retry_all(&AlwaysOk).await.unwrap();
        assert_eq!(report, RetryReport::default());
        assert_eq!(store.write_count(), 0);

        store.set(QUEUE_KEY, "[]").unwrap();
        queue.retry_all(&AlwaysOk).await.unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_persisted_layout_after_failed_pass() {
        let (store, queue) = queue();
        queue.enqueue(sale("s1"), ENDPOINT).await.unwrap();
        queue.retry_all(&ScriptedTransport::failing()).await.unwrap();

        let raw = store.get(QUEUE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["sale"]["id"], "s1");
        assert_eq!(entries[0]["sale"]["saleItems"][0]["productId"], "p1");
        assert_eq!(entries[0]["sale"]["saleItems"][0]["quantity"], 2);
        assert_eq!(entries[0]["sale"]["saleItems"][0]["sellingPrice"], 5.0);
        assert_eq!(entries[0]["retryCount"], 1);
        assert_eq!(entries[0]["api"], ENDPOINT);
    }

    #[tokio::test]
    async fn test_endpoint_is_kept_per_entry() {
        let (_, queue) = queue();
        queue.enqueue(sale("A"), "https://one/pos/sale").await.unwrap();
        queue.enqueue(sale("B"), "https://two/pos/sale").await.unwrap();
        queue.retry_all(&ScriptedTransport::failing()).await.unwrap();

        let pending = queue.pending().unwrap();
        assert_eq!(pending[0].api, "https://one/pos/sale");
        assert_eq!(pending[1].api, "https://two/pos/sale");
    }

    #[tokio::test]
    async fn test_corrupt_slot_is_a_storage_error() {
        let (store, queue) = queue();
        store.set(QUEUE_KEY, "{not json").unwrap();
        assert!(queue.enqueue(sale("A"), ENDPOINT).await.is_err());
        assert!(queue.retry_all(&AlwaysOk).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_ceiling() {
        let (_, queue) = queue();
        let queue = queue.with_max_retries(2);
        let transport = ScriptedTransport::failing();
        queue.enqueue(sale("A"), ENDPOINT).await.unwrap();

        queue.retry_all(&transport).await.unwrap();
        queue.retry_all(&transport).await.unwrap();
        assert_eq!(queue.len().unwrap(), 1);
        queue.retry_all(&transport).await.unwrap();
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_zero_ceiling_still_attempts_delivery() {
        let (_, queue) = queue();
        let queue = queue.with_max_retries(0);
        assert_eq!(queue.max_retries(), 1);
        let transport = ScriptedTransport::failing();
        queue.enqueue(sale("A"), ENDPOINT).await.unwrap();

        let report = queue.retry_all(&transport).await.unwrap();
        assert_eq!(report, RetryReport { delivered: 0, failed: 1, dropped: 0 });
        assert_eq!(transport.attempts(), vec!["A"]);

        let report = queue.retry_all(&transport).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_queues_sharing_a_directory_keep_both_writes() {
        let dir = tempfile::tempdir().unwrap();
        let first = SaleRetryQueue::new(Arc::new(FileKeyValueStore::open(dir.path()).unwrap()));
        let second = SaleRetryQueue::new(Arc::new(FileKeyValueStore::open(dir.path()).unwrap()));
        first.enqueue(sale("A"), ENDPOINT).await.unwrap();

        let held = lock_slot(&*first.store, QUEUE_KEY).await.unwrap();
        let writer = tokio::spawn(async move {
            second.enqueue(sale("B"), ENDPOINT).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!writer.is_finished());
        assert_eq!(first.len().unwrap(), 1);

        drop(held);
        writer.await.unwrap();
        let ids: Vec<String> = first.pending().unwrap().into_iter().map(|q| q.sale.id).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
