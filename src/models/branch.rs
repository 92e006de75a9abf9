use serde::Serialize;
use sqlx::FromRow;
use chrono::{DateTime, Utc};

#[derive(Debug, FromRow, Serialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}
