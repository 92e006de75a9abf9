use serde::Deserialize;
use chrono::NaiveDate;

use crate::models::logistics::{ExpenseCategory, TripStatus};

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub plate: String,
    pub description: Option<String>,
    pub capacity_kg: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateVehicleRequest {
    pub plate: Option<String>,
    pub description: Option<String>,
    pub capacity_kg: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub vehicle_id: Option<i64>,
    pub sale_id: Option<i64>,
    pub client_id: Option<i64>,
    pub address: String,
    pub scheduled_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct CreatePickupRequest {
    pub vehicle_id: Option<i64>,
    pub purchase_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub address: String,
    pub scheduled_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct UpdateTripStatusRequest {
    pub status: TripStatus,
}

#[derive(Deserialize)]
pub struct TripQueryParams {
    pub status: Option<TripStatus>,
    pub vehicle_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub vehicle_id: Option<i64>,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ExpenseQueryParams {
    pub vehicle_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
