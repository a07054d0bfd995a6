// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Vendor point profile and product catalog

use crate::types::AppError;
use serde::{Deserialize, Serialize};

/// Lowest and highest product price accepted from a POS profile
pub const PRICE_RANGE: std::ops::RangeInclusive<f64> = -1000.0..=1000.0;

/// A product tile in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Negative for deposit returns
    pub price: f64,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilecolor: Option<String>,
    #[serde(
        default,
        rename = "imageURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

/// Vendor point profile as cached on the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub festival: String,
    #[serde(default)]
    pub save_sales: bool,
    /// Where the profile was fetched from. Not part of the remote payload.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl PosData {
    /// An empty profile pointing at `url`
    pub fn unfetched(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products in display order
    pub fn sorted_products(&self) -> Vec<&Product> {
        let mut products: Vec<&Product> = self.products.iter().collect();
        products.sort_by_key(|p| p.order);
        products
    }
}

/// Shape of a profile as served by the vendor backend
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RemotePosData {
    id: String,
    name: String,
    #[serde(default)]
    festival: Option<String>,
    #[serde(default)]
    save_sales: Option<bool>,
    products: Vec<RemoteProduct>,
}

#[derive(Deserialize)]
struct RemoteProduct {
    id: String,
    name: String,
    price: f64,
    order: serde_json::Number,
    #[serde(default)]
    tilecolor: Option<String>,
    #[serde(default, rename = "imageURL")]
    image_url: Option<String>,
}

/// Integral JSON number, including floats such as `1.0`
fn integer_order(order: &serde_json::Number) -> Option<i64> {
    if let Some(value) = order.as_i64() {
        return Some(value);
    }
    let value = order.as_f64()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// Parse and validate a profile fetched from `url`
pub fn parse_pos_data(body: &str, url: &str) -> Result<PosData, AppError> {
    let remote: RemotePosData =
        serde_json::from_str(body).map_err(|e| AppError::InvalidPosData(e.to_string()))?;

    let mut products = Vec::with_capacity(remote.products.len());
    for product in remote.products {
        if !PRICE_RANGE.contains(&product.price) {
            return Err(AppError::InvalidPosData(format!(
                "Price {} of product {} is out of range",
                product.price, product.id
            )));
        }
        let order = integer_order(&product.order).ok_or_else(|| {
            AppError::InvalidPosData(format!("Order of product {} is not an integer", product.id))
        })?;

        products.push(Product {
            id: product.id,
            name: product.name,
            price: product.price,
            order,
            tilecolor: product.tilecolor,
            image_url: product.image_url,
        });
    }

    Ok(PosData {
        id: remote.id,
        name: remote.name,
        festival: remote.festival.unwrap_or_default(),
        save_sales: remote.save_sales.unwrap_or(false),
        url: url.to_string(),
        products,
    })
}
