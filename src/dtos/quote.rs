use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::PaymentMethod;
use crate::models::quote::{QuotationItem, QuoteStatus};

#[derive(Debug, Deserialize)]
pub struct CreateQuotationRequest {
    pub supplier_id: i64,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<QuotationItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct QuotationItemRequest {
    pub product_id: i64,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteStatusRequest {
    pub status: QuoteStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuotationRequest {
    pub branch_id: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct QuotationQueryParams {
    pub status: Option<QuoteStatus>,
    pub supplier_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct QuotationResponse {
    pub id: i64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub purchase_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub total: f64,
    pub items: Vec<QuotationItem>,
}
