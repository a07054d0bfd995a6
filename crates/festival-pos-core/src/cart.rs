// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Cart and checkout computation

use crate::catalog::{PosData, Product};
use crate::sale::{Sale, SaleItem};
use crate::types::AppError;
use std::collections::BTreeMap;

/// Product quantities picked for the current customer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: BTreeMap<String, u32>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product_id: &str) {
        *self.lines.entry(product_id.to_string()).or_insert(0) += 1;
    }

    /// Take one unit off, dropping the line when it reaches zero
    pub fn remove(&mut self, product_id: &str) {
        if let Some(quantity) = self.lines.get_mut(product_id) {
            *quantity -= 1;
            if *quantity == 0 {
                self.lines.remove(product_id);
            }
        }
    }

    pub fn quantity(&self, product_id: &str) -> u32 {
        self.lines.get(product_id).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Price times quantity over every line found in the catalog
    pub fn total(&self, pos: &PosData) -> f64 {
        self.lines
            .iter()
            .filter_map(|(id, quantity)| pos.product(id).map(|p| p.price * f64::from(*quantity)))
            .sum()
    }

    /// Negative-priced products (deposit returns) in the cart, in catalog order
    pub fn deposit_returns<'a>(&self, pos: &'a PosData) -> Vec<&'a Product> {
        pos.sorted_products()
            .into_iter()
            .filter(|p| p.price < 0.0 && self.lines.contains_key(&p.id))
            .collect()
    }

    /// Build the sale for this cart, pricing items from the current catalog
    pub fn to_sale(&self, pos: &PosData) -> Result<Sale, AppError> {
        let deposits = self.deposit_returns(pos);
        if !deposits.is_empty() {
            let names: Vec<&str> = deposits.iter().map(|p| p.name.as_str()).collect();
            return Err(AppError::InvalidSale(format!(
                "Deposit returns cannot be sold through checkout: {}",
                names.join(", ")
            )));
        }

        let mut items = Vec::with_capacity(self.lines.len());
        for product in pos.sorted_products() {
            if let Some(quantity) = self.lines.get(&product.id) {
                items.push(SaleItem {
                    product_id: product.id.clone(),
                    quantity: *quantity,
                    selling_price: product.price,
                });
            }
        }

        if let Some(unknown) = self.lines.keys().find(|id| pos.product(id).is_none()) {
            return Err(AppError::InvalidSale(format!(
                "Product {} is not in the catalog",
                unknown
            )));
        }

        Sale::new(pos.id.clone(), items)
    }
}

/// Change owed for a cash payment, or None if the amount given is unusable
pub fn change_due(total: f64, given: f64) -> Option<f64> {
    if given.is_finite() && given >= 0.0 {
        Some(given - total)
    } else {
        None
    }
}

/// Endpoint that receives sales for the POS profile at `pos_url`
pub fn sale_endpoint(pos_url: &str) -> String {
    let base = pos_url.split("/pos").next().unwrap_or(pos_url);
    format!("{}/pos/sale", base)
}
