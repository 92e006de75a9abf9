use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, FromRow)]
pub struct FixedAsset {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub acquisition_cost: f64,
    pub acquisition_date: NaiveDate,
    pub useful_life_years: i32,
    pub created_at: DateTime<Utc>,
}
