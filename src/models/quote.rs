use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quote_status")]
pub enum QuoteStatus {
    #[sqlx(rename = "Pendiente")]
    #[serde(rename = "Pendiente")]
    Pending,
    #[sqlx(rename = "Aprobada")]
    #[serde(rename = "Aprobada")]
    Approved,
    #[sqlx(rename = "Rechazada")]
    #[serde(rename = "Rechazada")]
    Rejected,
}

#[derive(Debug, FromRow)]
pub struct Quotation {
    pub id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub purchase_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct QuotationItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_cost: f64,
}
