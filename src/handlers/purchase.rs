use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use crate::dtos::purchase::{
    AssociatedCostRequest, CompletePurchaseResponse, CreatePurchaseRequest, PurchaseItemRequest,
    PurchaseListItem, PurchaseQueryParams, PurchaseResponse, ReceivedLot,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::purchase::{Purchase, PurchaseCost, PurchaseItem, PurchaseStatus};
use crate::models::PaymentMethod;
use crate::services::costing::{self, AssociatedCost, CostLine};
use crate::services::credit::{self, Counterparty};
use crate::services::notify::spawn_notification;
use crate::state::AppState;

const PURCHASE_SELECT: &str = r#"SELECT
        pu.id, pu.supplier_id, s.name AS supplier_name, pu.branch_id, pu.status,
        pu.payment_method, pu.total, pu.purchase_date, pu.notes, pu.created_by,
        pu.completed_at, pu.created_at
    FROM purchases pu
    JOIN suppliers s ON pu.supplier_id = s.id"#;

/// Everything needed to write a new pending purchase.
pub(crate) struct PurchaseDraft {
    pub supplier_id: i64,
    pub branch_id: i64,
    pub payment_method: PaymentMethod,
    pub purchase_date: chrono::NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<PurchaseItemRequest>,
    pub associated_costs: Vec<AssociatedCostRequest>,
}

fn cost_inputs(items: &[PurchaseItemRequest], costs: &[AssociatedCostRequest]) -> (Vec<CostLine>, Vec<AssociatedCost>) {
    let lines = items
        .iter()
        .map(|i| CostLine { quantity: i.quantity, unit_cost: i.unit_cost })
        .collect();
    let costs = costs
        .iter()
        .map(|c| AssociatedCost { description: c.description.clone(), amount: c.amount, prorate: c.prorate })
        .collect();
    (lines, costs)
}

/// Insert a `Pendiente` purchase inside the caller's transaction.
///
/// Credit purchases reserve the total against the supplier's limit first.
pub(crate) async fn insert_purchase(
    conn: &mut PgConnection,
    draft: &PurchaseDraft,
    created_by: i64,
) -> Result<i64, AppError> {
    let (lines, costs) = cost_inputs(&draft.items, &draft.associated_costs);
    costing::validate(&lines, &costs)?;
    let total = costing::round2(costing::purchase_total(&lines, &costs));

    let branch_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
        .bind(draft.branch_id)
        .fetch_one(&mut *conn)
        .await?;
    if !branch_exists {
        return Err(AppError::not_found("Branch not found"));
    }

    if draft.payment_method.is_credit() {
        if total <= 0.0 {
            return Err(AppError::validation("Credit purchases must have a positive total"));
        }
        credit::reserve_credit(&mut *conn, Counterparty::Supplier, draft.supplier_id, total).await?;
    }

    let purchase_id: i64 = sqlx::query_scalar(
        r#"INSERT INTO purchases (supplier_id, branch_id, payment_method, total, purchase_date, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id"#,
    )
    .bind(draft.supplier_id)
    .bind(draft.branch_id)
    .bind(draft.payment_method)
    .bind(total)
    .bind(draft.purchase_date)
    .bind(&draft.notes)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate purchase", "Invalid supplier_id or branch_id"))?;

    for item in &draft.items {
        sqlx::query("INSERT INTO purchase_items (purchase_id, product_id, quantity, unit_cost) VALUES ($1, $2, $3, $4)")
            .bind(purchase_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost)
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::from_constraint(
                e,
                "Duplicate purchase item",
                &format!("Product {} not found", item.product_id),
            ))?;
    }

    for cost in &draft.associated_costs {
        sqlx::query("INSERT INTO purchase_costs (purchase_id, description, amount, prorate) VALUES ($1, $2, $3, $4)")
            .bind(purchase_id)
            .bind(cost.description.trim())
            .bind(cost.amount)
            .bind(cost.prorate)
            .execute(&mut *conn)
            .await?;
    }

    Ok(purchase_id)
}

pub(crate) async fn fetch_purchase(conn: &mut PgConnection, id: i64) -> Result<PurchaseResponse, AppError> {
    let purchase = sqlx::query_as::<_, Purchase>(&format!("{PURCHASE_SELECT} WHERE pu.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase not found"))?;

    let items = sqlx::query_as::<_, PurchaseItem>(
        r#"SELECT pi.id, pi.product_id, p.name AS product_name, pi.quantity, pi.unit_cost, pi.real_cost
        FROM purchase_items pi
        JOIN products p ON pi.product_id = p.id
        WHERE pi.purchase_id = $1
        ORDER BY pi.id"#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let associated_costs = sqlx::query_as::<_, PurchaseCost>(
        "SELECT id, description, amount, prorate FROM purchase_costs WHERE purchase_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(PurchaseResponse {
        id: purchase.id,
        supplier_id: purchase.supplier_id,
        supplier_name: purchase.supplier_name,
        branch_id: purchase.branch_id,
        status: purchase.status,
        payment_method: purchase.payment_method,
        total: purchase.total,
        purchase_date: purchase.purchase_date,
        notes: purchase.notes,
        created_by: purchase.created_by,
        completed_at: purchase.completed_at,
        created_at: purchase.created_at,
        items,
        associated_costs,
    })
}

async fn fetch_with_pool(pool: &PgPool, id: i64) -> Result<PurchaseResponse, AppError> {
    let mut conn = pool.acquire().await?;
    fetch_purchase(&mut *conn, id).await
}

#[instrument(skip(state, auth, req), fields(user_id = auth.user_id))]
pub async fn create_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let draft = PurchaseDraft {
        supplier_id: req.supplier_id,
        branch_id: req.branch_id,
        payment_method: req.payment_method,
        purchase_date: req.purchase_date.unwrap_or_else(|| Utc::now().date_naive()),
        notes: req.notes,
        items: req.items,
        associated_costs: req.associated_costs,
    };

    let mut tx = state.db_pool.begin().await?;
    let id = insert_purchase(&mut *tx, &draft, auth.user_id).await?;
    let purchase = fetch_purchase(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = id, total = purchase.total, "Purchase created");
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    Query(params): Query<PurchaseQueryParams>,
) -> Result<Json<Vec<PurchaseListItem>>, AppError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(PURCHASE_SELECT);
    query.push(" WHERE 1=1");
    if let Some(status) = params.status {
        query.push(" AND pu.status = ").push_bind(status);
    }
    if let Some(supplier_id) = params.supplier_id {
        query.push(" AND pu.supplier_id = ").push_bind(supplier_id);
    }
    if let Some(branch_id) = params.branch_id {
        query.push(" AND pu.branch_id = ").push_bind(branch_id);
    }
    query.push(" ORDER BY pu.purchase_date DESC, pu.id DESC");

    let purchases = query.build_query_as::<Purchase>().fetch_all(&state.db_pool).await?;

    Ok(Json(
        purchases
            .into_iter()
            .map(|p| PurchaseListItem {
                id: p.id,
                supplier_name: p.supplier_name,
                branch_id: p.branch_id,
                status: p.status,
                payment_method: p.payment_method,
                total: p.total,
                purchase_date: p.purchase_date,
            })
            .collect(),
    ))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PurchaseResponse>, AppError> {
    fetch_with_pool(&state.db_pool, id).await.map(Json)
}

/// Lock the purchase row and return its status, payment method and total.
async fn lock_purchase(
    conn: &mut PgConnection,
    id: i64,
) -> Result<(PurchaseStatus, PaymentMethod, i64, f64, Option<i64>), AppError> {
    sqlx::query_as::<_, (PurchaseStatus, PaymentMethod, i64, f64, Option<i64>)>(
        "SELECT status, payment_method, supplier_id, total, created_by FROM purchases WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("Purchase not found"))
}

/// Receive a pending purchase: prorate associated costs, create one lot per
/// line at the purchase's branch and overwrite each product's cost.
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn complete_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<CompletePurchaseResponse>, AppError> {
    let mut tx = state.db_pool.begin().await?;

    let (status, _, _, _, created_by) = lock_purchase(&mut *tx, id).await?;
    if status != PurchaseStatus::Pending {
        return Err(AppError::conflict("Only pending purchases can be completed"));
    }

    let current = fetch_purchase(&mut *tx, id).await?;
    let lines: Vec<CostLine> = current
        .items
        .iter()
        .map(|i| CostLine { quantity: i.quantity, unit_cost: i.unit_cost })
        .collect();
    let costs: Vec<AssociatedCost> = current
        .associated_costs
        .iter()
        .map(|c| AssociatedCost { description: c.description.clone(), amount: c.amount, prorate: c.prorate })
        .collect();

    let prorated = costing::prorate(&lines, &costs)?;
    let entry_date = Utc::now().date_naive();
    let mut lots = Vec::with_capacity(prorated.len());

    for (item, line) in current.items.iter().zip(prorated.iter()) {
        let lot_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO inventory_lots (product_id, branch_id, purchase_id, quantity, initial_quantity, unit_price, entry_date)
            VALUES ($1, $2, $3, $4, $4, $5, $6)
            RETURNING id"#,
        )
        .bind(item.product_id)
        .bind(current.branch_id)
        .bind(id)
        .bind(item.quantity)
        .bind(line.real_unit_cost)
        .bind(entry_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET cost = $2 WHERE id = $1")
            .bind(item.product_id)
            .bind(line.real_unit_cost)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE purchase_items SET real_cost = $2 WHERE id = $1")
            .bind(item.id)
            .bind(line.real_unit_cost)
            .execute(&mut *tx)
            .await?;

        lots.push(ReceivedLot {
            lot_id,
            product_id: item.product_id,
            quantity: item.quantity,
            subtotal: line.subtotal,
            prorated_share: line.prorated_share,
            real_unit_cost: line.real_unit_cost,
        });
    }

    sqlx::query("UPDATE purchases SET status = $2, completed_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(PurchaseStatus::Completed)
        .execute(&mut *tx)
        .await?;

    let purchase = fetch_purchase(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = id, lots = lots.len(), "Purchase completed");

    let recipient = created_by.unwrap_or(auth.user_id);
    spawn_notification(
        state.db_pool.clone(),
        recipient,
        "Compra completada".to_string(),
        format!(
            "Purchase #{} from {} received: {} lot(s) added to inventory",
            id, purchase.supplier_name, lots.len()
        ),
    );

    Ok(Json(CompletePurchaseResponse { purchase, lots }))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn cancel_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<PurchaseResponse>, AppError> {
    auth.require_manager("cancel purchases")?;

    let mut tx = state.db_pool.begin().await?;

    let (status, payment_method, supplier_id, total, _) = lock_purchase(&mut *tx, id).await?;
    if status != PurchaseStatus::Pending {
        return Err(AppError::conflict("Only pending purchases can be cancelled"));
    }

    if payment_method.is_credit() && total > 0.0 {
        credit::release_credit(&mut *tx, Counterparty::Supplier, supplier_id, total).await?;
    }

    sqlx::query("UPDATE purchases SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(PurchaseStatus::Cancelled)
        .execute(&mut *tx)
        .await?;

    let purchase = fetch_purchase(&mut *tx, id).await?;
    tx.commit().await?;

    tracing::info!(purchase_id = id, "Purchase cancelled");
    Ok(Json(purchase))
}
