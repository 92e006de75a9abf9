use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;

use crate::dtos::fixed_asset::{AsOfQuery, CreateFixedAssetRequest, FixedAssetResponse, UpdateFixedAssetRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::fixed_asset::FixedAsset;
use crate::state::AppState;

const ASSET_COLUMNS: &str =
    "id, name, category, branch_id, acquisition_cost, acquisition_date, useful_life_years, created_at";

fn validate(cost: Option<f64>, life: Option<i32>) -> Result<(), AppError> {
    if cost.is_some_and(|c| c < 0.0) {
        return Err(AppError::validation("Acquisition cost cannot be negative"));
    }
    if life.is_some_and(|l| l <= 0) {
        return Err(AppError::validation("Useful life must be at least 1 year"));
    }
    Ok(())
}

pub async fn list_assets(
    State(state): State<AppState>,
    Query(q): Query<AsOfQuery>,
) -> Result<Json<Vec<FixedAssetResponse>>, AppError> {
    let as_of = q.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let assets = sqlx::query_as::<_, FixedAsset>(&format!(
        "SELECT {ASSET_COLUMNS} FROM fixed_assets ORDER BY acquisition_date, id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(assets.into_iter().map(|a| FixedAssetResponse::from_model(a, as_of)).collect()))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(q): Query<AsOfQuery>,
) -> Result<Json<FixedAssetResponse>, AppError> {
    let as_of = q.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let asset = sqlx::query_as::<_, FixedAsset>(&format!("SELECT {ASSET_COLUMNS} FROM fixed_assets WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Fixed asset not found"))?;

    Ok(Json(FixedAssetResponse::from_model(asset, as_of)))
}

pub async fn create_asset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateFixedAssetRequest>,
) -> Result<(StatusCode, Json<FixedAssetResponse>), AppError> {
    auth.require_manager("register fixed assets")?;
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Asset name is required"));
    }
    validate(Some(req.acquisition_cost), Some(req.useful_life_years))?;

    let asset = sqlx::query_as::<_, FixedAsset>(&format!(
        "INSERT INTO fixed_assets (name, category, branch_id, acquisition_cost, acquisition_date, useful_life_years)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(req.name.trim())
    .bind(&req.category)
    .bind(req.branch_id)
    .bind(req.acquisition_cost)
    .bind(req.acquisition_date)
    .bind(req.useful_life_years)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate asset", "Branch not found"))?;

    Ok((StatusCode::CREATED, Json(FixedAssetResponse::from_model(asset, Utc::now().date_naive()))))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateFixedAssetRequest>,
) -> Result<Json<FixedAssetResponse>, AppError> {
    auth.require_manager("update fixed assets")?;
    validate(req.acquisition_cost, req.useful_life_years)?;

    let asset = sqlx::query_as::<_, FixedAsset>(&format!(
        "UPDATE fixed_assets SET
            name = COALESCE($2, name),
            category = COALESCE($3, category),
            branch_id = COALESCE($4, branch_id),
            acquisition_cost = COALESCE($5, acquisition_cost),
            acquisition_date = COALESCE($6, acquisition_date),
            useful_life_years = COALESCE($7, useful_life_years)
         WHERE id = $1
         RETURNING {ASSET_COLUMNS}"
    ))
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.category)
    .bind(req.branch_id)
    .bind(req.acquisition_cost)
    .bind(req.acquisition_date)
    .bind(req.useful_life_years)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate asset", "Branch not found"))?
    .ok_or_else(|| AppError::not_found("Fixed asset not found"))?;

    Ok(Json(FixedAssetResponse::from_model(asset, Utc::now().date_naive())))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete fixed assets")?;

    let result = sqlx::query("DELETE FROM fixed_assets WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Fixed asset not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
