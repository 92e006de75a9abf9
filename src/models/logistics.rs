use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

/// Lifecycle shared by deliveries and pickups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status")]
pub enum TripStatus {
    #[sqlx(rename = "Pendiente")]
    #[serde(rename = "Pendiente")]
    Pending,
    #[sqlx(rename = "En ruta")]
    #[serde(rename = "En ruta")]
    InTransit,
    #[sqlx(rename = "Entregada")]
    #[serde(rename = "Entregada")]
    Delivered,
    #[sqlx(rename = "Cancelada")]
    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl TripStatus {
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        use TripStatus::*;
        matches!(
            (self, next),
            (Pending, InTransit) | (Pending, Cancelled) | (InTransit, Delivered) | (InTransit, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "expense_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Fuel,
    Maintenance,
    Toll,
    Other,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    pub description: Option<String>,
    pub capacity_kg: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Delivery {
    pub id: i64,
    pub vehicle_id: Option<i64>,
    pub sale_id: Option<i64>,
    pub client_id: Option<i64>,
    pub address: String,
    pub scheduled_date: NaiveDate,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Pickup {
    pub id: i64,
    pub vehicle_id: Option<i64>,
    pub purchase_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub address: String,
    pub scheduled_date: NaiveDate,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct LogisticsExpense {
    pub id: i64,
    pub vehicle_id: Option<i64>,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::TripStatus::*;

    #[test]
    fn trip_lifecycle() {
        assert!(Pending.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
