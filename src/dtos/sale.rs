use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::PaymentMethod;
use crate::models::sale::{SaleItem, SaleStatus};
use crate::services::pricing::{SaleTotals, SaleUnit};

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    /// Optional for walk-in sales; required for credit sales
    pub client_id: Option<i64>,
    pub branch_id: i64,
    pub payment_method: PaymentMethod,
    pub sale_date: Option<NaiveDate>,
    pub items: Vec<SaleItemRequest>,
}

#[derive(Deserialize)]
pub struct SaleItemRequest {
    pub product_id: i64,
    pub quantity: f64,
    #[serde(default)]
    pub unit: SaleUnit,
    /// Optional - uses the product price (times bulk factor for bulk) if not provided
    pub unit_price: Option<f64>,
}

#[derive(Deserialize)]
pub struct SaleQueryParams {
    pub client_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub status: Option<SaleStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: i64,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub branch_id: i64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub sale_date: NaiveDate,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub totals: SaleTotals,
    pub items: Vec<SaleItem>,
}

#[derive(Serialize)]
pub struct SaleListItem {
    pub id: i64,
    pub client_name: Option<String>,
    pub branch_id: i64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub margin: f64,
    pub sale_date: NaiveDate,
}
