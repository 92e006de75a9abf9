use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

use crate::dtos::purchase::{PurchaseItemRequest, PurchaseResponse};
use crate::dtos::quote::{
    ConvertQuotationRequest, CreateQuotationRequest, QuotationItemRequest, QuotationQueryParams,
    QuotationResponse, UpdateQuoteStatusRequest,
};
use crate::error::AppError;
use crate::handlers::purchase::{fetch_purchase, insert_purchase, PurchaseDraft};
use crate::middleware::auth::AuthContext;
use crate::models::quote::{Quotation, QuotationItem, QuoteStatus};
use crate::state::AppState;

const QUOTE_SELECT: &str = r#"SELECT
        q.id, q.supplier_id, s.name AS supplier_name, q.status, q.valid_until, q.notes,
        q.purchase_id, q.created_by, q.created_at
    FROM quotations q
    JOIN suppliers s ON q.supplier_id = s.id"#;

async fn fetch_quotation(conn: &mut PgConnection, id: i64) -> Result<QuotationResponse, AppError> {
    let quote = sqlx::query_as::<_, Quotation>(&format!("{QUOTE_SELECT} WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation not found"))?;

    let items = sqlx::query_as::<_, QuotationItem>(
        r#"SELECT qi.id, qi.product_id, p.name AS product_name, qi.quantity, qi.unit_cost
        FROM quotation_items qi
        JOIN products p ON qi.product_id = p.id
        WHERE qi.quotation_id = $1
        ORDER BY qi.id"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(QuotationResponse {
        id: quote.id,
        supplier_id: quote.supplier_id,
        supplier_name: quote.supplier_name,
        status: quote.status,
        valid_until: quote.valid_until,
        notes: quote.notes,
        purchase_id: quote.purchase_id,
        created_by: quote.created_by,
        created_at: quote.created_at,
        total: items.iter().map(|i| i.quantity * i.unit_cost).sum(),
        items,
    })
}

fn validate_items(items: &[QuotationItemRequest]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::validation("Quotation must contain at least one item"));
    }
    for item in items {
        if item.quantity.is_nan() || item.quantity <= 0.0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        if item.unit_cost.is_nan() || item.unit_cost < 0.0 {
            return Err(AppError::validation("Unit cost cannot be negative"));
        }
    }
    Ok(())
}

#[instrument(skip(state, auth, req), fields(user_id = auth.user_id))]
pub async fn create_quotation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<QuotationResponse>), AppError> {
    validate_items(&req.items)?;

    let mut tx = state.db_pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO quotations (supplier_id, valid_until, notes, created_by) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(req.supplier_id)
    .bind(req.valid_until)
    .bind(&req.notes)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate quotation", "Supplier not found"))?;

    for item in &req.items {
        sqlx::query("INSERT INTO quotation_items (quotation_id, product_id, quantity, unit_cost) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::from_constraint(e, "Duplicate item", &format!("Product {} not found", item.product_id)))?;
    }

    let quote = fetch_quotation(&mut *tx, id).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn list_quotations(
    State(state): State<AppState>,
    Query(params): Query<QuotationQueryParams>,
) -> Result<Json<Vec<QuotationResponse>>, AppError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT q.id FROM quotations q WHERE 1=1");
    if let Some(status) = params.status {
        query.push(" AND q.status = ").push_bind(status);
    }
    if let Some(supplier_id) = params.supplier_id {
        query.push(" AND q.supplier_id = ").push_bind(supplier_id);
    }
    query.push(" ORDER BY q.created_at DESC, q.id DESC");

    let ids: Vec<i64> = query.build_query_scalar::<i64>().fetch_all(&state.db_pool).await?;

    let mut conn = state.db_pool.acquire().await?;
    let mut quotes = Vec::with_capacity(ids.len());
    for id in ids {
        quotes.push(fetch_quotation(&mut *conn, id).await?);
    }
    Ok(Json(quotes))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuotationResponse>, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    fetch_quotation(&mut *conn, id).await.map(Json)
}

pub async fn update_quotation_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateQuoteStatusRequest>,
) -> Result<Json<QuotationResponse>, AppError> {
    auth.require_manager("approve or reject quotations")?;
    if req.status == QuoteStatus::Pending {
        return Err(AppError::validation("Status must be Aprobada or Rechazada"));
    }

    let mut tx = state.db_pool.begin().await?;

    let current = sqlx::query_scalar::<_, QuoteStatus>("SELECT status FROM quotations WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation not found"))?;
    if current != QuoteStatus::Pending {
        return Err(AppError::conflict("Only pending quotations can change status"));
    }

    sqlx::query("UPDATE quotations SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(req.status)
        .execute(&mut *tx)
        .await?;

    let quote = fetch_quotation(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(Json(quote))
}

/// Turn an approved quotation into a pending purchase order.
#[instrument(skip(state, auth, req), fields(user_id = auth.user_id))]
pub async fn convert_to_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<ConvertQuotationRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let mut tx = state.db_pool.begin().await?;

    let (status, purchase_id) =
        sqlx::query_as::<_, (QuoteStatus, Option<i64>)>("SELECT status, purchase_id FROM quotations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Quotation not found"))?;

    if status != QuoteStatus::Approved {
        return Err(AppError::conflict("Only approved quotations can become purchases"));
    }
    if let Some(existing) = purchase_id {
        return Err(AppError::conflict(format!("Quotation already converted to purchase #{existing}")));
    }

    let quote = fetch_quotation(&mut *tx, id).await?;
    let draft = PurchaseDraft {
        supplier_id: quote.supplier_id,
        branch_id: req.branch_id,
        payment_method: req.payment_method,
        purchase_date: Utc::now().date_naive(),
        notes: Some(format!("From quotation #{id}")),
        items: quote
            .items
            .iter()
            .map(|i| PurchaseItemRequest { product_id: i.product_id, quantity: i.quantity, unit_cost: i.unit_cost })
            .collect(),
        associated_costs: Vec::new(),
    };

    let new_purchase_id = insert_purchase(&mut *tx, &draft, auth.user_id).await?;

    sqlx::query("UPDATE quotations SET purchase_id = $2 WHERE id = $1")
        .bind(id)
        .bind(new_purchase_id)
        .execute(&mut *tx)
        .await?;

    let purchase = fetch_purchase(&mut *tx, new_purchase_id).await?;
    tx.commit().await?;

    tracing::info!(quotation_id = id, purchase_id = new_purchase_id, "Quotation converted");
    Ok((StatusCode::CREATED, Json(purchase)))
}
