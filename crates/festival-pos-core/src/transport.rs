// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - HTTP client for the vendor backend
//
// Posts sales and fetches POS profiles. Sale delivery never returns an
// error: anything short of a 2xx response is reported as a failed attempt.

use crate::catalog::{parse_pos_data, PosData};
use crate::sale::Sale;
use crate::types::AppError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Delivers a sale to its endpoint
#[async_trait]
pub trait SaleTransport: Send + Sync {
    /// True if the endpoint acknowledged the sale with a success status
    async fn post_sale(&self, sale: &Sale, endpoint: &str) -> bool;
}

/// Source of POS profiles
#[async_trait]
pub trait PosSource: Send + Sync {
    async fn fetch_pos(&self, url: &str) -> Result<PosData, AppError>;
}

/// reqwest-backed client for sales and POS profiles
#[derive(Clone)]
pub struct PosClient {
    http_client: Client,
}

impl PosClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Post a sale, surfacing the reason for a failed attempt
    pub async fn submit_sale(&self, sale: &Sale, endpoint: &str) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(endpoint)
            .json(sale)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::Network(format!("Cannot connect to {}: {}", endpoint, e))
                } else if e.is_timeout() {
                    AppError::Network(format!("Request to {} timed out", endpoint))
                } else {
                    AppError::Network(format!("Sale request failed: {}", e))
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Network(format!(
                "Sale endpoint returned status {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl SaleTransport for PosClient {
    async fn post_sale(&self, sale: &Sale, endpoint: &str) -> bool {
        match self.submit_sale(sale, endpoint).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(sale_id = %sale.id, "Failed to post sale: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl PosSource for PosClient {
    async fn fetch_pos(&self, url: &str) -> Result<PosData, AppError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Failed to fetch POS profile: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "POS profile request returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_pos_data(&body, url)
    }
}
