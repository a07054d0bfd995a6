// SPDX-License-Identifier: AGPL-3.0
// Festival POS Sync - Command handlers

use crate::state::AppState;
use festival_pos_core::{
    change_due, retry_interval_from_minutes, sale_endpoint, AppError, Cart, CheckoutOutcome,
    IntervalTrigger, PeriodicTrigger, PosData, QueuedSale, Sale,
};
use std::path::Path;

/// Retry queued sales on a timer until Ctrl-C
pub async fn run(state: &AppState, interval: Option<u64>, now: bool) -> Result<(), AppError> {
    let period = match interval {
        Some(minutes) => retry_interval_from_minutes(minutes)?,
        None => state.settings.get().retry_interval()?,
    };

    let trigger = IntervalTrigger::new(period).run_immediately(now);
    let handle = trigger.start(state.sales.retry_task());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::FileIo(format!("Failed to listen for Ctrl-C: {}", e)))?;

    tracing::info!("Shutting down background sync");
    handle.stop();
    Ok(())
}

pub async fn retry(state: &AppState) -> Result<(), AppError> {
    let report = state.sales.try_retry().await?;
    println!(
        "delivered {}, still pending {}, dropped {}",
        report.delivered, report.failed, report.dropped
    );
    Ok(())
}

pub async fn status(state: &AppState) -> Result<(), AppError> {
    let pending = state.sales.pending().await?;
    if pending.is_empty() {
        println!("No queued sales");
        return Ok(());
    }

    for entry in &pending {
        println!("{}", format_queued(entry));
    }
    Ok(())
}

pub async fn enqueue(state: &AppState, file: &Path, endpoint: &str) -> Result<(), AppError> {
    let sale = read_sale_file(file)?;
    state.sales.add_sale(sale, endpoint).await
}

/// Checkout a cart built from product ids against the cached catalog
pub async fn sell(state: &AppState, products: &[String], cash: Option<f64>) -> Result<(), AppError> {
    let pos = state.pos.load()?;
    if pos.url.is_empty() {
        return Err(AppError::InvalidConfig(
            "no POS configured, run `pos set-url` first".to_string(),
        ));
    }

    let mut cart = Cart::new();
    for id in products {
        cart.add(id);
    }

    let total = cart.total(&pos);
    println!("Total: {:.2}", total);
    if let Some(given) = cash {
        match change_due(total, given) {
            Some(change) => println!("Change: {:.2}", change),
            None => println!("Enter the amount received"),
        }
    }

    if let Some(notice) = deposit_notice(&cart, &pos) {
        println!("{}", notice);
        return Err(AppError::InvalidSale(notice));
    }

    let sale = cart.to_sale(&pos)?;
    let endpoint = sale_endpoint(&pos.url);
    match state.sales.checkout(sale, &endpoint).await? {
        CheckoutOutcome::Posted => println!("Sale recorded"),
        CheckoutOutcome::Queued => println!("Backend unreachable, sale queued for retry"),
    }
    Ok(())
}

pub async fn pos_set_url(state: &AppState, url: &str) -> Result<(), AppError> {
    let pos = state.pos.update_url(url).await?;
    println!("{} ({} products)", pos.name, pos.products.len());
    Ok(())
}

pub async fn pos_refresh(state: &AppState) -> Result<(), AppError> {
    let pos = state.pos.refresh_products().await?;
    println!("{} ({} products)", pos.name, pos.products.len());
    Ok(())
}

pub fn pos_show(state: &AppState) -> Result<(), AppError> {
    let pos = state.pos.load()?;
    println!("{}", serde_json::to_string_pretty(&pos)?);
    Ok(())
}

pub fn pos_logout(state: &AppState) -> Result<(), AppError> {
    state.pos.logout()
}

/// Message for a cart holding deposit returns, which checkout cannot record
fn deposit_notice(cart: &Cart, pos: &PosData) -> Option<String> {
    let deposits = cart.deposit_returns(pos);
    if deposits.is_empty() {
        return None;
    }
    let names: Vec<&str> = deposits.iter().map(|p| p.name.as_str()).collect();
    Some(format!(
        "Deposit items cannot be sold: {}. Remove them and check out again.",
        names.join(", ")
    ))
}

fn read_sale_file(file: &Path) -> Result<Sale, AppError> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| AppError::FileIo(format!("Failed to read {}: {}", file.display(), e)))?;
    let sale: Sale = serde_json::from_str(&content)?;

    // re-validate items from untrusted input
    Sale::with_id(sale.id, sale.vendor_point_id, sale.sale_date, sale.sale_items)
}

fn format_queued(entry: &QueuedSale) -> String {
    format!(
        "{}  {}  retries={}  total={:.2}  -> {}",
        entry.sale.id,
        entry.sale.sale_date.to_rfc3339(),
        entry.retry_count,
        entry.sale.total(),
        entry.api
    )
}
