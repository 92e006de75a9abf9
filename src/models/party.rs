use serde::Serialize;
use sqlx::FromRow;
use chrono::{DateTime, Utc};

/// A client or a supplier; both tables share this shape.
#[derive(Debug, FromRow, Serialize)]
pub struct Party {
    pub id: i64,
    pub name: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit: f64,
    pub credit_used: f64,
    pub created_at: DateTime<Utc>,
}
