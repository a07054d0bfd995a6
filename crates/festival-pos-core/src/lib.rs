// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Shared logic for all hosts
//
// This crate provides:
// - Sale, cart and catalog types
// - SaleRetryQueue, the persisted offline queue for undelivered sales
// - SalesService, the checkout-facing API over the queue
// - PosStore for the cached vendor point profile
// - SettingsStore for persistent settings
// - PosClient (HTTP) and IntervalTrigger (tokio) as default collaborators
//
// Host-specific wiring lives in separate crates.

pub mod cart;
pub mod catalog;
pub mod pos;
pub mod retry_queue;
pub mod sale;
pub mod sales;
pub mod settings;
pub mod storage;
pub mod transport;
pub mod trigger;
pub mod types;

// Re-export commonly used items
pub use cart::{change_due, sale_endpoint, Cart};
pub use catalog::{parse_pos_data, PosData, Product};
pub use pos::PosStore;
pub use retry_queue::{RetryReport, SaleRetryQueue, MAX_RETRIES, QUEUE_KEY};
pub use sale::{QueuedSale, Sale, SaleItem};
pub use sales::{CheckoutOutcome, SalesService};
pub use settings::SettingsStore;
pub use storage::{lock_slot, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SlotLock};
pub use transport::{PosClient, PosSource, SaleTransport};
pub use trigger::{IntervalTrigger, PeriodicTrigger, TriggerHandle, TriggerTask};
pub use types::{retry_interval_from_minutes, AppError, AppSettings, MAX_RETRY_INTERVAL_MINUTES};
