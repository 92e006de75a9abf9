use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, DateTime, Utc};

use crate::models::fixed_asset::FixedAsset;
use crate::services::depreciation::{self, DepreciationSnapshot};

#[derive(Debug, Deserialize)]
pub struct CreateFixedAssetRequest {
    pub name: String,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub acquisition_cost: f64,
    pub acquisition_date: NaiveDate,
    pub useful_life_years: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFixedAssetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub acquisition_cost: Option<f64>,
    pub acquisition_date: Option<NaiveDate>,
    pub useful_life_years: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct FixedAssetResponse {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub branch_id: Option<i64>,
    pub acquisition_cost: f64,
    pub acquisition_date: NaiveDate,
    pub useful_life_years: i32,
    pub created_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub depreciation: DepreciationSnapshot,
}

impl FixedAssetResponse {
    pub fn from_model(asset: FixedAsset, as_of: NaiveDate) -> Self {
        let depreciation = depreciation::snapshot(
            asset.acquisition_cost,
            asset.useful_life_years,
            asset.acquisition_date,
            as_of,
        );
        Self {
            id: asset.id,
            name: asset.name,
            category: asset.category,
            branch_id: asset.branch_id,
            acquisition_cost: asset.acquisition_cost,
            acquisition_date: asset.acquisition_date,
            useful_life_years: asset.useful_life_years,
            created_at: asset.created_at,
            as_of,
            depreciation,
        }
    }
}
