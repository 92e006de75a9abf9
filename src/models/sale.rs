use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

use super::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_status")]
pub enum SaleStatus {
    #[sqlx(rename = "Completada")]
    #[serde(rename = "Completada")]
    Completed,
    #[sqlx(rename = "Cancelada")]
    #[serde(rename = "Cancelada")]
    Cancelled,
}

#[derive(Debug, FromRow)]
pub struct Sale {
    pub id: i64,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub branch_id: i64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub cost: f64,
    pub margin: f64,
    pub sale_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct SaleItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
    pub base_quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
    pub tax: f64,
    pub cost: f64,
}

#[derive(Debug, FromRow)]
pub struct SaleLotAllocation {
    pub lot_id: i64,
    pub quantity: f64,
    pub unit_cost: f64,
}
