use axum::{extract::{State, Path, Query}, Json};
use sqlx::{Postgres, QueryBuilder};
use crate::state::AppState;
use crate::error::AppError;
use crate::dtos::inventory::{LotQueryParams, StockQueryParams};
use crate::models::inventory::{InventoryLot, StockLevel};

const LOT_SELECT: &str = r#"SELECT
        l.id, l.product_id, p.sku, p.name AS product_name, l.branch_id, l.purchase_id,
        l.quantity, l.initial_quantity, l.unit_price, l.entry_date, l.created_at
    FROM inventory_lots l
    JOIN products p ON l.product_id = p.id
    WHERE 1=1"#;

pub async fn list_lots(
    State(state): State<AppState>,
    Query(params): Query<LotQueryParams>,
) -> Result<Json<Vec<InventoryLot>>, AppError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(LOT_SELECT);

    if let Some(product_id) = params.product_id {
        query.push(" AND l.product_id = ").push_bind(product_id);
    }
    if let Some(branch_id) = params.branch_id {
        query.push(" AND l.branch_id = ").push_bind(branch_id);
    }
    if params.only_available {
        query.push(" AND l.quantity > 0");
    }
    query.push(" ORDER BY l.entry_date ASC, l.id ASC");

    let lots = query.build_query_as::<InventoryLot>().fetch_all(&state.db_pool).await?;
    Ok(Json(lots))
}

pub async fn get_lot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<InventoryLot>, AppError> {
    let lot = sqlx::query_as::<_, InventoryLot>(&format!("{LOT_SELECT} AND l.id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory lot not found"))?;

    Ok(Json(lot))
}

/// Per-product totals across lots, optionally for one branch.
pub async fn stock_levels(
    State(state): State<AppState>,
    Query(params): Query<StockQueryParams>,
) -> Result<Json<Vec<StockLevel>>, AppError> {
    let levels = sqlx::query_as::<_, StockLevel>(
        r#"SELECT
            p.id AS product_id, p.sku, p.name AS product_name,
            COALESCE(SUM(l.quantity), 0) AS quantity,
            COUNT(l.id) FILTER (WHERE l.quantity > 0) AS lot_count,
            COALESCE(SUM(l.quantity * l.unit_price), 0) AS valuation
        FROM products p
        LEFT JOIN inventory_lots l
            ON l.product_id = p.id AND ($1::BIGINT IS NULL OR l.branch_id = $1)
        GROUP BY p.id, p.sku, p.name
        ORDER BY p.name"#,
    )
    .bind(params.branch_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(levels))
}
