use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use crate::dtos::branch::{CreateBranchRequest, UpdateBranchRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::branch::Branch;
use crate::state::AppState;

pub async fn list_branches(State(state): State<AppState>) -> Result<Json<Vec<Branch>>, AppError> {
    let branches = sqlx::query_as::<_, Branch>("SELECT id, name, address, created_at FROM branches ORDER BY name")
        .fetch_all(&state.db_pool)
        .await?;
    Ok(Json(branches))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Branch>, AppError> {
    sqlx::query_as::<_, Branch>("SELECT id, name, address, created_at FROM branches WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Branch not found"))
}

pub async fn create_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBranchRequest>,
) -> Result<(StatusCode, Json<Branch>), AppError> {
    auth.require_manager("create branches")?;
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Branch name is required"));
    }

    let branch = sqlx::query_as::<_, Branch>(
        "INSERT INTO branches (name, address) VALUES ($1, $2) RETURNING id, name, address, created_at",
    )
    .bind(req.name.trim())
    .bind(&req.address)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Branch name already exists", "Invalid branch reference"))?;

    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn update_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBranchRequest>,
) -> Result<Json<Branch>, AppError> {
    auth.require_manager("update branches")?;

    sqlx::query_as::<_, Branch>(
        "UPDATE branches SET name = COALESCE($2, name), address = COALESCE($3, address)
         WHERE id = $1 RETURNING id, name, address, created_at",
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.address)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Branch name already exists", "Invalid branch reference"))?
    .map(Json)
    .ok_or_else(|| AppError::not_found("Branch not found"))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete branches")?;

    let result = sqlx::query("DELETE FROM branches WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Branch is in use", "Branch still has inventory, purchases or sales"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Branch not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
