// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Sale records
//
// A Sale is immutable once created. QueuedSale wraps one for the
// offline retry queue; its JSON layout is the persisted slot format.

use crate::types::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub quantity: u32,
    /// Unit price captured at sale time
    pub selling_price: f64,
}

/// A completed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub vendor_point_id: String,
    pub sale_date: DateTime<Utc>,
    pub sale_items: Vec<SaleItem>,
}

impl Sale {
    /// Create a sale with a fresh id, stamped with the current time
    pub fn new(vendor_point_id: impl Into<String>, items: Vec<SaleItem>) -> Result<Self, AppError> {
        Self::with_id(Uuid::new_v4().to_string(), vendor_point_id, Utc::now(), items)
    }

    /// Create a sale from explicit parts, validating every item
    pub fn with_id(
        id: impl Into<String>,
        vendor_point_id: impl Into<String>,
        sale_date: DateTime<Utc>,
        items: Vec<SaleItem>,
    ) -> Result<Self, AppError> {
        for item in &items {
            if item.quantity == 0 {
                return Err(AppError::InvalidSale(format!(
                    "Quantity must be positive for product {}",
                    item.product_id
                )));
            }
            if !item.selling_price.is_finite() || item.selling_price < 0.0 {
                return Err(AppError::InvalidSale(format!(
                    "Selling price must be non-negative for product {}",
                    item.product_id
                )));
            }
        }

        Ok(Self {
            id: id.into(),
            vendor_point_id: vendor_point_id.into(),
            sale_date,
            sale_items: items,
        })
    }

    /// Sum of quantity times unit price over all items
    pub fn total(&self) -> f64 {
        self.sale_items
            .iter()
            .map(|item| item.selling_price * f64::from(item.quantity))
            .sum()
    }
}

/// A sale waiting in the offline retry queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSale {
    pub sale: Sale,
    pub retry_count: u32,
    /// Endpoint the original post targeted
    pub api: String,
}

impl QueuedSale {
    pub fn new(sale: Sale, api: impl Into<String>) -> Self {
        Self {
            sale,
            retry_count: 0,
            api: api.into(),
        }
    }
}
