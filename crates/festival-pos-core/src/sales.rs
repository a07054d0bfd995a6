// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Sales service
//
// Entry point for the checkout flow and the background trigger. Owns the
// retry queue and serializes every queue operation through one lock. The
// queue itself also locks its slot, which covers other processes sharing
// the data directory.

use crate::retry_queue::{RetryReport, SaleRetryQueue};
use crate::sale::{QueuedSale, Sale};
use crate::storage::KeyValueStore;
use crate::transport::SaleTransport;
use crate::trigger::TriggerTask;
use crate::types::AppError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Result of a checkout submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Live post accepted by the endpoint
    Posted,
    /// Live post failed, sale queued for background retry
    Queued,
}

/// Shared handle over the retry queue and the in-memory sales list
#[derive(Clone)]
pub struct SalesService {
    queue: Arc<Mutex<SaleRetryQueue<dyn KeyValueStore>>>,
    transport: Arc<dyn SaleTransport>,
    sales: Arc<RwLock<Vec<Sale>>>,
}

impl SalesService {
    pub fn new(store: Arc<dyn KeyValueStore>, transport: Arc<dyn SaleTransport>) -> Self {
        Self::with_queue(SaleRetryQueue::new(store), transport)
    }

    pub fn with_queue(
        queue: SaleRetryQueue<dyn KeyValueStore>,
        transport: Arc<dyn SaleTransport>,
    ) -> Self {
        Self {
            queue: Arc::new(Mutex::new(queue)),
            transport,
            sales: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a sale whose live post failed
    pub async fn add_sale(&self, sale: Sale, endpoint: &str) -> Result<(), AppError> {
        {
            let queue = self.queue.lock().await;
            queue.enqueue(sale.clone(), endpoint).await?;
        }

        self.sales
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sale);
        Ok(())
    }

    /// Queue a sale on a detached task. The caller does not observe the
    /// outcome; a storage failure is logged.
    pub fn spawn_add_sale(&self, sale: Sale, endpoint: String) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let sale_id = sale.id.clone();
            if let Err(e) = service.add_sale(sale, &endpoint).await {
                tracing::error!(sale_id = %sale_id, "Failed to queue sale: {}", e);
            }
        })
    }

    /// Forget a handled sale in the in-memory list. The persisted queue is untouched.
    pub fn clear_sale(&self, sale_id: &str) {
        self.sales
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != sale_id);
    }

    /// Sales added during this process lifetime and not cleared
    pub fn sales(&self) -> Vec<Sale> {
        self.sales
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persisted retry queue contents
    pub async fn pending(&self) -> Result<Vec<QueuedSale>, AppError> {
        self.queue.lock().await.pending()
    }

    /// Run one retry pass, propagating storage failures
    pub async fn try_retry(&self) -> Result<RetryReport, AppError> {
        let queue = self.queue.lock().await;
        queue.retry_all(&*self.transport).await
    }

    /// Run one retry pass for a background trigger. Failures are logged, never raised.
    pub async fn retry(&self) -> Option<RetryReport> {
        match self.try_retry().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("Retry pass failed: {}", e);
                None
            }
        }
    }

    /// Task suitable for registering with a PeriodicTrigger
    pub fn retry_task(&self) -> TriggerTask {
        let service = self.clone();
        Arc::new(move || {
            let service = service.clone();
            Box::pin(async move {
                service.retry().await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    /// Post a finished sale live, falling back to the retry queue
    pub async fn checkout(&self, sale: Sale, endpoint: &str) -> Result<CheckoutOutcome, AppError> {
        if self.transport.post_sale(&sale, endpoint).await {
            tracing::info!(sale_id = %sale.id, "Sale posted");
            return Ok(CheckoutOutcome::Posted);
        }

        tracing::info!(sale_id = %sale.id, "Failed to post sale, saving for retry");
        self.add_sale(sale, endpoint).await?;
        Ok(CheckoutOutcome::Queued)
    }
}
