//! Data-store collaborator interface
//!
//! The orchestration layer never issues raw queries; it consumes these
//! named read functions. Implementations live outside this subsystem (the
//! web application's repository layer); tests supply an in-memory mock.

use anyhow::Result;
use async_trait::async_trait;
use stocka_types::{
    InventorySummary, ProductRow, TransactionRow, TransactionStats, WarehouseOccupancy,
};

/// Read-only inventory queries, one per catalogue function
#[async_trait]
pub trait InventoryReader: Send + Sync {
    /// Free-text search over name, SKU and category
    async fn search_products(&self, query: &str) -> Result<Vec<ProductRow>>;

    /// All products in a category
    async fn products_by_category(&self, category: &str) -> Result<Vec<ProductRow>>;

    /// Single product lookup; `None` for an unknown SKU
    async fn product_by_sku(&self, sku: &str) -> Result<Option<ProductRow>>;

    /// Products at or below the stock threshold
    async fn low_stock_items(&self, threshold: i64) -> Result<Vec<ProductRow>>;

    /// Products whose total value exceeds the threshold
    async fn high_value_items(&self, threshold: f64) -> Result<Vec<ProductRow>>;

    /// Total monetary value of all stock
    async fn total_inventory_value(&self) -> Result<f64>;

    /// Aggregate statistics over the whole inventory
    async fn inventory_summary(&self) -> Result<InventorySummary>;

    /// Most recent transactions, newest first
    async fn recent_transactions(&self, limit: u32) -> Result<Vec<TransactionRow>>;

    /// Transaction aggregates over the trailing window
    async fn transaction_stats(&self, days: u32) -> Result<TransactionStats>;

    /// Warehouse slot occupancy per zone
    async fn warehouse_occupancy(&self) -> Result<WarehouseOccupancy>;
}
