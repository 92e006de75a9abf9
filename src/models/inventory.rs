use serde::Serialize;
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

/// One received lot, joined with its product for display.
#[derive(Debug, FromRow, Serialize)]
pub struct InventoryLot {
    pub id: i64,
    pub product_id: i64,
    pub sku: String,
    pub product_name: String,
    pub branch_id: i64,
    pub purchase_id: Option<i64>,
    /// Remaining quantity in base units
    pub quantity: f64,
    pub initial_quantity: f64,
    /// Real unit cost the lot was received at
    pub unit_price: f64,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct StockLevel {
    pub product_id: i64,
    pub sku: String,
    pub product_name: String,
    pub quantity: f64,
    pub lot_count: i64,
    pub valuation: f64,
}
