//! Row and aggregate shapes returned by the data-store collaborator
//!
//! The orchestration layer never issues raw queries; it consumes these
//! shapes from named read functions on the `InventoryReader` trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// One product row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRow {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub warehouse_location: Option<String>,
}

impl ProductRow {
    /// Quantity times unit price
    pub fn total_value(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Inbound,
    Outbound,
    Adjustment,
}

/// One stock transaction row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: String,
    pub sku: String,
    pub product_name: String,
    pub kind: TransactionKind,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate statistics over the whole inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_quantity: i64,
    pub total_value: f64,
    pub low_stock_count: u64,
    pub category_count: u64,
}

/// Transaction aggregates over a trailing window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStats {
    pub period_days: u32,
    pub total_transactions: u64,
    pub inbound_units: i64,
    pub outbound_units: i64,
    pub net_change: i64,
}

/// Occupancy of one warehouse zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneOccupancy {
    pub zone: String,
    pub capacity: u64,
    pub used: u64,
}

/// Warehouse slot occupancy report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseOccupancy {
    pub total_slots: u64,
    pub occupied_slots: u64,
    pub zones: Vec<ZoneOccupancy>,
}

impl WarehouseOccupancy {
    /// Occupied fraction in percent, 0 when the warehouse has no slots
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_slots == 0 {
            0.0
        } else {
            self.occupied_slots as f64 / self.total_slots as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_total_value() {
        let row = ProductRow {
            sku: "PEN-001".into(),
            name: "Blue Pen".into(),
            category: "Stationery".into(),
            quantity: 40,
            unit_price: 1.25,
            warehouse_location: Some("A-01".into()),
        };
        assert!((row.total_value() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_occupancy_rate_empty_warehouse() {
        let occupancy = WarehouseOccupancy {
            total_slots: 0,
            occupied_slots: 0,
            zones: vec![],
        };
        assert_eq!(occupancy.occupancy_rate(), 0.0);
    }
}
