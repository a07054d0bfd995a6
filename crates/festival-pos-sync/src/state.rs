// SPDX-License-Identifier: AGPL-3.0
// Festival POS Sync - Application State

use festival_pos_core::{
    AppError, FileKeyValueStore, KeyValueStore, PosClient, PosStore, SaleRetryQueue,
    SalesService, SettingsStore,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Stores and services shared by every command
pub struct AppState {
    pub settings: SettingsStore,
    pub sales: SalesService,
    pub pos: PosStore,
}

impl AppState {
    /// Create application state with all stores opened
    pub fn new(settings_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self, AppError> {
        let settings = match settings_path {
            Some(path) => SettingsStore::open(path)?,
            None => SettingsStore::new()?,
        };
        let config = settings.get();

        let data_dir = match data_dir {
            Some(dir) => dir,
            None => config.resolve_data_dir()?,
        };
        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::open(data_dir)?);
        let client = Arc::new(PosClient::new(config.request_timeout())?);

        let queue = SaleRetryQueue::new(store.clone()).with_max_retries(config.max_retries);
        let sales = SalesService::with_queue(queue, client.clone());
        let pos = PosStore::new(store, client);

        Ok(Self {
            settings,
            sales,
            pos,
        })
    }
}
