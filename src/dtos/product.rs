// src/dtos/product.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub taxable: bool,
    #[serde(default)]
    pub tax_rate: f64,
    pub bulk_factor: Option<f64>,
    pub bulk_unit_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub taxable: Option<bool>,
    pub tax_rate: Option<f64>,
    pub bulk_factor: Option<f64>,
    pub bulk_unit_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub cost: f64,
    pub taxable: bool,
    pub tax_rate: f64,
    pub bulk_factor: f64,
    pub bulk_unit_name: Option<String>,
    pub created_at: String,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            sku: product.sku,
            name: product.name,
            price: product.price,
            cost: product.cost,
            taxable: product.taxable,
            tax_rate: product.tax_rate,
            bulk_factor: product.bulk_factor,
            bulk_unit_name: product.bulk_unit_name,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}
