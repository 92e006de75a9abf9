//! Clients and suppliers. Both tables have the same shape, so each endpoint
//! is one function parameterised by [`Counterparty`] plus thin wrappers the
//! routes point at.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::PgPool;
use tracing::instrument;

use crate::dtos::party::{CreatePartyRequest, CreditPaymentRequest, CreditPaymentResponse, UpdatePartyRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::party::Party;
use crate::services::credit::{self, Counterparty};
use crate::state::AppState;

const PARTY_COLUMNS: &str = "id, name, tax_id, email, phone, address, credit_limit, credit_used, created_at";

async fn list(pool: &PgPool, party: Counterparty) -> Result<Vec<Party>, AppError> {
    let sql = format!("SELECT {PARTY_COLUMNS} FROM {} ORDER BY name", party.table());
    Ok(sqlx::query_as::<_, Party>(&sql).fetch_all(pool).await?)
}

async fn fetch(pool: &PgPool, party: Counterparty, id: i64) -> Result<Party, AppError> {
    let sql = format!("SELECT {PARTY_COLUMNS} FROM {} WHERE id = $1", party.table());
    sqlx::query_as::<_, Party>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", party.label())))
}

async fn create(pool: &PgPool, party: Counterparty, req: CreatePartyRequest) -> Result<Party, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    if req.credit_limit.is_nan() || req.credit_limit < 0.0 {
        return Err(AppError::validation("Credit limit cannot be negative"));
    }

    let sql = format!(
        "INSERT INTO {} (name, tax_id, email, phone, address, credit_limit)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PARTY_COLUMNS}",
        party.table()
    );
    sqlx::query_as::<_, Party>(&sql)
        .bind(req.name.trim())
        .bind(&req.tax_id)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.address)
        .bind(req.credit_limit)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Tax id already registered", "Invalid reference"))
}

async fn update(pool: &PgPool, party: Counterparty, id: i64, req: UpdatePartyRequest) -> Result<Party, AppError> {
    if req.credit_limit.is_some_and(|l| l.is_nan() || l < 0.0) {
        return Err(AppError::validation("Credit limit cannot be negative"));
    }

    let mut tx = pool.begin().await?;

    // Lock so a concurrent reservation cannot slip in above the new limit
    let lock_sql = format!("SELECT credit_used FROM {} WHERE id = $1 FOR UPDATE", party.table());
    let credit_used = sqlx::query_scalar::<_, f64>(&lock_sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", party.label())))?;

    if let Some(limit) = req.credit_limit {
        if limit < credit_used {
            return Err(AppError::validation(format!(
                "Credit limit ({limit:.2}) cannot be below credit in use ({credit_used:.2})"
            )));
        }
    }

    let sql = format!(
        "UPDATE {} SET
            name = COALESCE($2, name),
            tax_id = COALESCE($3, tax_id),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            address = COALESCE($6, address),
            credit_limit = COALESCE($7, credit_limit)
         WHERE id = $1
         RETURNING {PARTY_COLUMNS}",
        party.table()
    );
    let updated = sqlx::query_as::<_, Party>(&sql)
        .bind(id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(&req.tax_id)
        .bind(&req.email)
        .bind(&req.phone)
        .bind(&req.address)
        .bind(req.credit_limit)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_constraint(e, "Tax id already registered", "Invalid reference"))?;

    tx.commit().await?;
    Ok(updated)
}

async fn delete(pool: &PgPool, party: Counterparty, id: i64) -> Result<(), AppError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", party.table());
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_constraint(
            e,
            "Record is in use",
            &format!("{} has purchases, sales or trips and cannot be deleted", party.label()),
        ))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("{} not found", party.label())));
    }
    Ok(())
}

/// A payment must be positive and cannot exceed what is owed.
fn check_payment(amount: f64, outstanding: Option<f64>) -> Result<(), AppError> {
    if amount.is_nan() || amount <= 0.0 {
        return Err(AppError::validation("Payment amount must be greater than 0"));
    }
    if let Some(current) = outstanding {
        if amount > current + 1e-9 {
            return Err(AppError::validation(format!(
                "Payment ({amount:.2}) exceeds outstanding credit ({current:.2})"
            )));
        }
    }
    Ok(())
}

async fn pay(pool: &PgPool, party: Counterparty, id: i64, amount: f64) -> Result<CreditPaymentResponse, AppError> {
    check_payment(amount, None)?;

    let mut tx = pool.begin().await?;

    let current = sqlx::query_scalar::<_, f64>(&format!("SELECT credit_used FROM {} WHERE id = $1 FOR UPDATE", party.table()))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", party.label())))?;
    check_payment(amount, Some(current))?;

    let line = credit::release_credit(&mut *tx, party, id, amount).await?;
    tx.commit().await?;

    tracing::info!(party = party.table(), id, amount, "Credit payment recorded");
    Ok(CreditPaymentResponse {
        id,
        amount_paid: amount,
        credit_limit: line.limit,
        credit_used: line.used,
        credit_available: line.available(),
    })
}

// ==================== Clients ====================

pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Party>>, AppError> {
    list(&state.db_pool, Counterparty::Client).await.map(Json)
}

pub async fn get_client(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Party>, AppError> {
    fetch(&state.db_pool, Counterparty::Client, id).await.map(Json)
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreatePartyRequest>,
) -> Result<(StatusCode, Json<Party>), AppError> {
    let party = create(&state.db_pool, Counterparty::Client, req).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePartyRequest>,
) -> Result<Json<Party>, AppError> {
    update(&state.db_pool, Counterparty::Client, id, req).await.map(Json)
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete clients")?;
    delete(&state.db_pool, Counterparty::Client, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, req))]
pub async fn record_client_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreditPaymentRequest>,
) -> Result<Json<CreditPaymentResponse>, AppError> {
    pay(&state.db_pool, Counterparty::Client, id, req.amount).await.map(Json)
}

// ==================== Suppliers ====================

pub async fn list_suppliers(State(state): State<AppState>) -> Result<Json<Vec<Party>>, AppError> {
    list(&state.db_pool, Counterparty::Supplier).await.map(Json)
}

pub async fn get_supplier(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Party>, AppError> {
    fetch(&state.db_pool, Counterparty::Supplier, id).await.map(Json)
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(req): Json<CreatePartyRequest>,
) -> Result<(StatusCode, Json<Party>), AppError> {
    let party = create(&state.db_pool, Counterparty::Supplier, req).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePartyRequest>,
) -> Result<Json<Party>, AppError> {
    update(&state.db_pool, Counterparty::Supplier, id, req).await.map(Json)
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete suppliers")?;
    delete(&state.db_pool, Counterparty::Supplier, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, req))]
pub async fn record_supplier_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CreditPaymentRequest>,
) -> Result<Json<CreditPaymentResponse>, AppError> {
    pay(&state.db_pool, Counterparty::Supplier, id, req.amount).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payments_must_be_positive_and_within_balance() {
        assert!(check_payment(50.0, Some(120.0)).is_ok());
        assert!(check_payment(120.0, Some(120.0)).is_ok());
        assert!(matches!(check_payment(120.01, Some(120.0)), Err(AppError::ValidationError(_))));
        assert!(matches!(check_payment(0.0, None), Err(AppError::ValidationError(_))));
        assert!(matches!(check_payment(-5.0, None), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn nan_payment_is_rejected() {
        assert!(matches!(check_payment(f64::NAN, None), Err(AppError::ValidationError(_))));
        assert!(matches!(check_payment(f64::NAN, Some(100.0)), Err(AppError::ValidationError(_))));
    }
}
