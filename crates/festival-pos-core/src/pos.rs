// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Cached POS profile
//
// The current vendor point profile lives in the `pos` slot so the
// catalog is available offline.

use crate::catalog::PosData;
use crate::storage::{read_json, write_json, KeyValueStore};
use crate::transport::PosSource;
use crate::types::AppError;
use std::sync::Arc;

/// Storage slot holding the cached profile
pub const POS_KEY: &str = "pos";

/// Cached POS profile backed by local storage
pub struct PosStore {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn PosSource>,
}

impl PosStore {
    pub fn new(store: Arc<dyn KeyValueStore>, source: Arc<dyn PosSource>) -> Self {
        Self { store, source }
    }

    /// Cached profile, or an empty one if none was saved
    pub fn load(&self) -> Result<PosData, AppError> {
        Ok(read_json(&*self.store, POS_KEY)?.unwrap_or_default())
    }

    fn save(&self, pos: &PosData) -> Result<(), AppError> {
        write_json(&*self.store, POS_KEY, pos)
    }

    /// Switch to a new profile URL and fetch it
    pub async fn update_url(&self, url: &str) -> Result<PosData, AppError> {
        tracing::info!("Updating POS URL to {}", url);
        let pos = PosData::unfetched(url);
        self.save(&pos)?;
        self.fetch_and_save(&pos).await
    }

    /// Drop the cached catalog and fetch it again from the saved URL
    pub async fn refresh_products(&self) -> Result<PosData, AppError> {
        let current = self.load()?;
        tracing::info!("Refreshing products from {}", current.url);
        self.save(&PosData {
            products: Vec::new(),
            ..current.clone()
        })?;
        self.fetch_and_save(&current).await
    }

    /// Forget the cached profile
    pub fn logout(&self) -> Result<(), AppError> {
        self.store.remove(POS_KEY)
    }

    async fn fetch_and_save(&self, current: &PosData) -> Result<PosData, AppError> {
        if current.url.is_empty() {
            return Err(AppError::InvalidConfig("no POS URL available".to_string()));
        }

        let fetched = self.source.fetch_pos(&current.url).await?;
        self.save(&fetched)?;
        tracing::info!(
            "Loaded POS {} with {} products",
            fetched.name,
            fetched.products.len()
        );
        Ok(fetched)
    }
}
