use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

use super::PaymentMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "purchase_status")]
pub enum PurchaseStatus {
    #[sqlx(rename = "Pendiente")]
    #[serde(rename = "Pendiente")]
    Pending,
    #[sqlx(rename = "Completada")]
    #[serde(rename = "Completada")]
    Completed,
    #[sqlx(rename = "Cancelada")]
    #[serde(rename = "Cancelada")]
    Cancelled,
}

#[derive(Debug, FromRow)]
pub struct Purchase {
    pub id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub branch_id: i64,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct PurchaseItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_cost: f64,
    /// Set when the purchase is completed
    pub real_cost: Option<f64>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct PurchaseCost {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub prorate: bool,
}
