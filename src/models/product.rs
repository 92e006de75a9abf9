use sqlx::FromRow;
use chrono::{DateTime, Utc};

use crate::services::pricing::PriceInfo;

#[derive(Debug, FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub price: f64,
    /// Real unit cost of the last completed purchase
    pub cost: f64,
    pub taxable: bool,
    pub tax_rate: f64,
    /// Base units per bulk unit
    pub bulk_factor: f64,
    pub bulk_unit_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn price_info(&self) -> PriceInfo {
        PriceInfo {
            price: self.price,
            taxable: self.taxable,
            tax_rate: self.tax_rate,
            bulk_factor: self.bulk_factor,
        }
    }
}
