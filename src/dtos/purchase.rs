use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::PaymentMethod;
use crate::models::purchase::{PurchaseCost, PurchaseItem, PurchaseStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub supplier_id: i64,
    pub branch_id: i64,
    pub payment_method: PaymentMethod,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseItemRequest>,
    #[serde(default)]
    pub associated_costs: Vec<AssociatedCostRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseItemRequest {
    pub product_id: i64,
    pub quantity: f64,
    pub unit_cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociatedCostRequest {
    pub description: String,
    pub amount: f64,
    #[serde(default = "default_prorate")]
    pub prorate: bool,
}

fn default_prorate() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PurchaseQueryParams {
    pub status: Option<PurchaseStatus>,
    pub supplier_id: Option<i64>,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
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
    pub items: Vec<PurchaseItem>,
    pub associated_costs: Vec<PurchaseCost>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseListItem {
    pub id: i64,
    pub supplier_name: String,
    pub branch_id: i64,
    pub status: PurchaseStatus,
    pub payment_method: PaymentMethod,
    pub total: f64,
    pub purchase_date: NaiveDate,
}

/// Lots created when a purchase is completed.
#[derive(Debug, Serialize)]
pub struct ReceivedLot {
    pub lot_id: i64,
    pub product_id: i64,
    pub quantity: f64,
    pub subtotal: f64,
    pub prorated_share: f64,
    pub real_unit_cost: f64,
}

#[derive(Debug, Serialize)]
pub struct CompletePurchaseResponse {
    pub purchase: PurchaseResponse,
    pub lots: Vec<ReceivedLot>,
}
