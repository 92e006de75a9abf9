use axum::{extract::{Path, Query, State}, Json, Extension};
use axum::http::StatusCode;
use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

use crate::state::AppState;
use crate::error::AppError;
use crate::dtos::sale::{CreateSaleRequest, SaleListItem, SaleQueryParams, SaleResponse};
use crate::handlers::product::PRODUCT_COLUMNS;
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::models::sale::{Sale, SaleItem, SaleLotAllocation, SaleStatus};
use crate::services::credit::{self, Counterparty};
use crate::services::pricing::{self, LineAmounts, SaleTotals, SaleUnit};
use crate::services::stock::{self, LotDraw};

const SALE_SELECT: &str = r#"SELECT
        s.id, s.client_id, c.name AS client_name, s.branch_id, s.status, s.payment_method,
        s.subtotal, s.tax, s.total, s.cost, s.margin, s.sale_date, s.created_by, s.created_at
    FROM sales s
    LEFT JOIN clients c ON s.client_id = c.id"#;

struct PreparedLine {
    product_id: i64,
    quantity: f64,
    unit: SaleUnit,
    base_quantity: f64,
    unit_price: f64,
    amounts: LineAmounts,
    draws: Vec<LotDraw>,
}

#[instrument(skip(state, auth, req), fields(user_id = auth.user_id))]
pub async fn create_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    if req.items.is_empty() {
        return Err(AppError::validation("Sale must contain at least one item"));
    }
    for item in &req.items {
        if item.quantity.is_nan() || item.quantity <= 0.0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        if item.unit_price.is_some_and(|p| p < 0.0) {
            return Err(AppError::validation("Unit price cannot be negative"));
        }
    }
    if req.payment_method.is_credit() && req.client_id.is_none() {
        return Err(AppError::validation("Credit sales require a client"));
    }

    // Start transaction
    let mut tx = state.db_pool.begin().await?;

    let branch_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
        .bind(req.branch_id)
        .fetch_one(&mut *tx)
        .await?;
    if !branch_exists {
        return Err(AppError::not_found("Branch not found"));
    }

    if let Some(client_id) = req.client_id {
        let client_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
            .bind(client_id)
            .fetch_one(&mut *tx)
            .await?;
        if !client_exists {
            return Err(AppError::not_found("Client not found"));
        }
    }

    let product_ids: Vec<i64> = req.items.iter().map(|i| i.product_id).collect();
    stock::lock_lots(&mut *tx, req.branch_id, &product_ids).await?;

    let mut lines = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;

        let info = product.price_info();
        let base_quantity = info.base_quantity(item.quantity, item.unit);
        let unit_price = item.unit_price.unwrap_or_else(|| info.default_unit_price(item.unit));

        let draws = stock::consume(&mut *tx, product.id, req.branch_id, base_quantity)
            .await
            .map_err(|e| match e {
                AppError::InsufficientStock(msg) => AppError::InsufficientStock(format!("'{}': {msg}", product.name)),
                other => other,
            })?;

        let amounts = pricing::line_amounts(&info, item.quantity, unit_price, stock::draws_cost(&draws));
        lines.push(PreparedLine {
            product_id: product.id,
            quantity: item.quantity,
            unit: item.unit,
            base_quantity,
            unit_price,
            amounts,
            draws,
        });
    }

    let amounts: Vec<LineAmounts> = lines.iter().map(|l| l.amounts).collect();
    let totals = pricing::sale_totals(&amounts);

    if req.payment_method.is_credit() {
        if totals.total <= 0.0 {
            return Err(AppError::validation("Credit sales must have a positive total"));
        }
        if let Some(client_id) = req.client_id {
            credit::reserve_credit(&mut *tx, Counterparty::Client, client_id, totals.total).await?;
        }
    }

    let sale_date = req.sale_date.unwrap_or_else(|| Utc::now().date_naive());
    let sale_id: i64 = sqlx::query_scalar(
        r#"INSERT INTO sales (client_id, branch_id, payment_method, subtotal, tax, total, cost, margin, sale_date, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id"#,
    )
    .bind(req.client_id)
    .bind(req.branch_id)
    .bind(req.payment_method)
    .bind(totals.subtotal)
    .bind(totals.tax)
    .bind(totals.total)
    .bind(totals.cost)
    .bind(totals.margin)
    .bind(sale_date)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        let item_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO sale_items (sale_id, product_id, quantity, unit, base_quantity, unit_price, subtotal, tax, cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id"#,
        )
        .bind(sale_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit.as_str())
        .bind(line.base_quantity)
        .bind(line.unit_price)
        .bind(line.amounts.subtotal)
        .bind(line.amounts.tax)
        .bind(line.amounts.cost)
        .fetch_one(&mut *tx)
        .await?;

        for draw in &line.draws {
            sqlx::query("INSERT INTO sale_lot_allocations (sale_item_id, lot_id, quantity, unit_cost) VALUES ($1, $2, $3, $4)")
                .bind(item_id)
                .bind(draw.lot_id)
                .bind(draw.quantity)
                .bind(draw.unit_cost)
                .execute(&mut *tx)
                .await?;
        }
    }

    let sale = fetch_sale(&mut *tx, sale_id).await?;

    // Commit transaction
    tx.commit().await?;

    tracing::info!(sale_id, total = totals.total, margin = totals.margin, "Sale recorded");
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SaleResponse>, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    fetch_sale(&mut *conn, id).await.map(Json)
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<SaleQueryParams>,
) -> Result<Json<Vec<SaleListItem>>, AppError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SALE_SELECT);
    query.push(" WHERE 1=1");
    if let Some(client_id) = params.client_id {
        query.push(" AND s.client_id = ").push_bind(client_id);
    }
    if let Some(branch_id) = params.branch_id {
        query.push(" AND s.branch_id = ").push_bind(branch_id);
    }
    if let Some(status) = params.status {
        query.push(" AND s.status = ").push_bind(status);
    }
    if let Some(from) = params.from {
        query.push(" AND s.sale_date >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        query.push(" AND s.sale_date <= ").push_bind(to);
    }
    query.push(" ORDER BY s.sale_date DESC, s.id DESC");

    let sales = query.build_query_as::<Sale>().fetch_all(&state.db_pool).await?;

    Ok(Json(
        sales
            .into_iter()
            .map(|s| SaleListItem {
                id: s.id,
                client_name: s.client_name,
                branch_id: s.branch_id,
                status: s.status,
                payment_method: s.payment_method,
                total: s.total,
                margin: s.margin,
                sale_date: s.sale_date,
            })
            .collect(),
    ))
}

/// Void a completed sale: lots get their quantities back and credit sales
/// release the client's credit.
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn cancel_sale(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<SaleResponse>, AppError> {
    auth.require_manager("cancel sales")?;

    let mut tx = state.db_pool.begin().await?;

    let sale = sqlx::query_as::<_, Sale>(&format!("{SALE_SELECT} WHERE s.id = $1 FOR UPDATE OF s"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Sale not found"))?;

    if sale.status != SaleStatus::Completed {
        return Err(AppError::conflict("Sale is already cancelled"));
    }

    let allocations = sqlx::query_as::<_, SaleLotAllocation>(
        r#"SELECT a.lot_id, a.quantity, a.unit_cost
        FROM sale_lot_allocations a
        JOIN sale_items si ON a.sale_item_id = si.id
        WHERE si.sale_id = $1
        ORDER BY a.id"#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let draws: Vec<LotDraw> = allocations
        .iter()
        .map(|a| LotDraw { lot_id: a.lot_id, quantity: a.quantity, unit_cost: a.unit_cost })
        .collect();
    stock::restore(&mut *tx, &draws).await?;

    if sale.payment_method.is_credit() && sale.total > 0.0 {
        if let Some(client_id) = sale.client_id {
            credit::release_credit(&mut *tx, Counterparty::Client, client_id, sale.total).await?;
        }
    }

    sqlx::query("UPDATE sales SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(SaleStatus::Cancelled)
        .execute(&mut *tx)
        .await?;

    let response = fetch_sale(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(sale_id = id, lots_restored = draws.len(), "Sale cancelled");
    Ok(Json(response))
}

// Helper function to fetch full sale details
async fn fetch_sale(conn: &mut PgConnection, id: i64) -> Result<SaleResponse, AppError> {
    let sale = sqlx::query_as::<_, Sale>(&format!("{SALE_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Sale not found"))?;

    let items = sqlx::query_as::<_, SaleItem>(
        r#"SELECT
            si.id, si.product_id, p.name AS product_name, si.quantity, si.unit,
            si.base_quantity, si.unit_price, si.subtotal, si.tax, si.cost
        FROM sale_items si
        JOIN products p ON si.product_id = p.id
        WHERE si.sale_id = $1
        ORDER BY si.id"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(SaleResponse {
        id: sale.id,
        client_id: sale.client_id,
        client_name: sale.client_name,
        branch_id: sale.branch_id,
        status: sale.status,
        payment_method: sale.payment_method,
        sale_date: sale.sale_date,
        created_by: sale.created_by,
        created_at: sale.created_at,
        totals: SaleTotals {
            subtotal: sale.subtotal,
            tax: sale.tax,
            total: sale.total,
            cost: sale.cost,
            margin: sale.margin,
        },
        items,
    })
}
