//! Per-function textual renderers
//!
//! Each function has a dedicated short summary for the chat reply. Renderers
//! never fail: any value that does not match the expected shape degrades to
//! a pretty-printed JSON dump of the raw result.

use serde_json::Value;
use stocka_types::{
    FunctionName, InventorySummary, ProductRow, TransactionRow, TransactionStats,
    WarehouseOccupancy,
};

const LIST_LIMIT: usize = 10;

/// Render a function result as user-facing text
pub fn render(function: FunctionName, value: &Value) -> String {
    let rendered = match function {
        FunctionName::SearchProducts => render_products(value, "No products matched the search."),
        FunctionName::GetProductsByCategory => {
            render_products(value, "No products in that category.")
        }
        FunctionName::GetProductBySku => render_single_product(value),
        FunctionName::GetLowStockItems => {
            render_products(value, "No products are low on stock.")
        }
        FunctionName::GetHighValueItems => {
            render_products(value, "No products exceed that value threshold.")
        }
        FunctionName::GetTotalInventoryValue => render_total_value(value),
        FunctionName::GetInventorySummary => render_summary(value),
        FunctionName::GetRecentTransactions => render_transactions(value),
        FunctionName::GetTransactionStats => render_transaction_stats(value),
        FunctionName::GetWarehouseOccupancy => render_occupancy(value),
    };
    rendered.unwrap_or_else(|| json_dump(value))
}

fn json_dump(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Numbered list of products capped at ten entries with a "+N more" suffix
fn render_products(value: &Value, empty_message: &str) -> Option<String> {
    let products: Vec<ProductRow> = serde_json::from_value(value.clone()).ok()?;
    if products.is_empty() {
        return Some(empty_message.to_string());
    }
    let mut lines: Vec<String> = products
        .iter()
        .take(LIST_LIMIT)
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. {} ({}) - {} in stock @ ${:.2}",
                i + 1,
                p.name,
                p.sku,
                p.quantity,
                p.unit_price
            )
        })
        .collect();
    if products.len() > LIST_LIMIT {
        lines.push(format!("...and {} more", products.len() - LIST_LIMIT));
    }
    Some(lines.join("\n"))
}

fn render_single_product(value: &Value) -> Option<String> {
    if value.is_null() {
        return Some("No product with that SKU.".to_string());
    }
    let product: ProductRow = serde_json::from_value(value.clone()).ok()?;
    let location = product
        .warehouse_location
        .as_deref()
        .unwrap_or("unassigned");
    Some(format!(
        "{} ({}): {} in stock @ ${:.2}, category {}, location {}",
        product.name,
        product.sku,
        product.quantity,
        product.unit_price,
        product.category,
        location
    ))
}

fn render_total_value(value: &Value) -> Option<String> {
    let total = value.as_f64()?;
    Some(format!("Total inventory value: ${total:.2}"))
}

fn render_summary(value: &Value) -> Option<String> {
    let summary: InventorySummary = serde_json::from_value(value.clone()).ok()?;
    Some(format!(
        "{} products across {} categories, {} units in stock worth ${:.2}; {} products low on stock",
        summary.total_products,
        summary.category_count,
        summary.total_quantity,
        summary.total_value,
        summary.low_stock_count
    ))
}

fn render_transactions(value: &Value) -> Option<String> {
    let transactions: Vec<TransactionRow> = serde_json::from_value(value.clone()).ok()?;
    if transactions.is_empty() {
        return Some("No recent transactions.".to_string());
    }
    let mut lines: Vec<String> = transactions
        .iter()
        .take(LIST_LIMIT)
        .enumerate()
        .map(|(i, t)| {
            format!(
                "{}. {} {} x{} ({})",
                i + 1,
                t.kind,
                t.product_name,
                t.quantity,
                t.occurred_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect();
    if transactions.len() > LIST_LIMIT {
        lines.push(format!("...and {} more", transactions.len() - LIST_LIMIT));
    }
    Some(lines.join("\n"))
}

fn render_transaction_stats(value: &Value) -> Option<String> {
    let stats: TransactionStats = serde_json::from_value(value.clone()).ok()?;
    Some(format!(
        "Last {} days: {} transactions, {} units in, {} units out, net change {}",
        stats.period_days,
        stats.total_transactions,
        stats.inbound_units,
        stats.outbound_units,
        stats.net_change
    ))
}

fn render_occupancy(value: &Value) -> Option<String> {
    let occupancy: WarehouseOccupancy = serde_json::from_value(value.clone()).ok()?;
    let mut text = format!(
        "Warehouse occupancy: {}/{} slots ({:.1}%)",
        occupancy.occupied_slots,
        occupancy.total_slots,
        occupancy.occupancy_rate()
    );
    for zone in &occupancy.zones {
        text.push_str(&format!("\n- zone {}: {}/{}", zone.zone, zone.used, zone.capacity));
    }
    Some(text)
}
