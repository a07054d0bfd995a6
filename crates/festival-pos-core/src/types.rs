// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application settings (host-agnostic)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Directory holding the local key-value slots. None uses the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Minutes between background retry passes
    #[serde(default = "default_retry_interval_minutes")]
    pub retry_interval_minutes: u64,
    /// Failed attempts after which a queued sale is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-request timeout for the HTTP transport
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_retry_interval_minutes() -> u64 {
    20
}

/// Longest accepted retry interval, one day
pub const MAX_RETRY_INTERVAL_MINUTES: u64 = 24 * 60;

/// Convert a retry interval in minutes, rejecting zero and anything above a day
pub fn retry_interval_from_minutes(minutes: u64) -> Result<Duration, AppError> {
    if minutes == 0 || minutes > MAX_RETRY_INTERVAL_MINUTES {
        return Err(AppError::InvalidConfig(format!(
            "Retry interval must be between 1 and {} minutes, got {}",
            MAX_RETRY_INTERVAL_MINUTES, minutes
        )));
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::InvalidConfig(format!("Retry interval too large: {}", minutes)))
}

fn default_max_retries() -> u32 {
    crate::retry_queue::MAX_RETRIES
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            retry_interval_minutes: default_retry_interval_minutes(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppSettings {
    pub fn retry_interval(&self) -> Result<Duration, AppError> {
        retry_interval_from_minutes(self.retry_interval_minutes)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the directory used for the persisted slots
    pub fn resolve_data_dir(&self) -> Result<PathBuf, AppError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        directories::ProjectDirs::from("ch", "festival", "pos")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| AppError::FileIo("Could not determine data directory".to_string()))
    }
}

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid POS data: {0}")]
    InvalidPosData(String),

    #[error("Invalid sale: {0}")]
    InvalidSale(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}
