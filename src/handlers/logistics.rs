//! Fleet: vehicles, deliveries to clients, pickups from suppliers and the
//! running costs booked against them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::{Postgres, QueryBuilder};

use crate::dtos::logistics::{
    CreateDeliveryRequest, CreateExpenseRequest, CreatePickupRequest, CreateVehicleRequest,
    ExpenseQueryParams, TripQueryParams, UpdateTripStatusRequest, UpdateVehicleRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::logistics::{Delivery, LogisticsExpense, Pickup, TripStatus, Vehicle};
use crate::state::AppState;

const VEHICLE_COLUMNS: &str = "id, plate, description, capacity_kg, is_active, created_at";
const DELIVERY_COLUMNS: &str = "id, vehicle_id, sale_id, client_id, address, scheduled_date, status, created_at";
const PICKUP_COLUMNS: &str = "id, vehicle_id, purchase_id, supplier_id, address, scheduled_date, status, created_at";
const EXPENSE_COLUMNS: &str = "id, vehicle_id, category, amount, expense_date, description, created_at";

fn map_vehicle_error(e: sqlx::Error) -> AppError {
    AppError::from_constraint(e, "Plate already registered", "Invalid vehicle reference")
}

// ==================== Vehicles ====================

pub async fn create_vehicle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    auth.require_manager("register vehicles")?;

    if req.plate.trim().is_empty() {
        return Err(AppError::validation("Plate is required"));
    }
    if req.capacity_kg.is_some_and(|c| c <= 0.0) {
        return Err(AppError::validation("Capacity must be greater than 0"));
    }

    let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
        "INSERT INTO vehicles (plate, description, capacity_kg) VALUES ($1, $2, $3) RETURNING {VEHICLE_COLUMNS}"
    ))
    .bind(req.plate.trim().to_uppercase())
    .bind(&req.description)
    .bind(req.capacity_kg)
    .fetch_one(&state.db_pool)
    .await
    .map_err(map_vehicle_error)?;

    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vehicle>, AppError> {
    sqlx::query_as::<_, Vehicle>(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Vehicle not found"))
}

pub async fn list_vehicles(State(state): State<AppState>) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = sqlx::query_as::<_, Vehicle>(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY plate ASC"))
        .fetch_all(&state.db_pool)
        .await?;
    Ok(Json(vehicles))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    auth.require_manager("update vehicles")?;

    sqlx::query_as::<_, Vehicle>(&format!(
        "UPDATE vehicles SET
            plate = COALESCE($2, plate),
            description = COALESCE($3, description),
            capacity_kg = COALESCE($4, capacity_kg),
            is_active = COALESCE($5, is_active)
         WHERE id = $1
         RETURNING {VEHICLE_COLUMNS}"
    ))
    .bind(id)
    .bind(req.plate.as_deref().map(|p| p.trim().to_uppercase()))
    .bind(&req.description)
    .bind(req.capacity_kg)
    .bind(req.is_active)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(map_vehicle_error)?
    .map(Json)
    .ok_or_else(|| AppError::not_found("Vehicle not found"))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete vehicles")?;

    // Check if vehicle has trip or expense history
    let in_use: bool = sqlx::query_scalar(
        r#"SELECT EXISTS(SELECT 1 FROM deliveries WHERE vehicle_id = $1)
            OR EXISTS(SELECT 1 FROM pickups WHERE vehicle_id = $1)
            OR EXISTS(SELECT 1 FROM logistics_expenses WHERE vehicle_id = $1)"#,
    )
    .bind(id)
    .fetch_one(&state.db_pool)
    .await?;

    if in_use {
        return Err(AppError::conflict("Cannot delete vehicle with deliveries, pickups or expenses"));
    }

    let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Vehicle not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Deliveries & pickups ====================

/// Deliveries and pickups share columns apart from their references.
#[derive(Clone, Copy)]
enum Trip {
    Delivery,
    Pickup,
}

impl Trip {
    fn table(self) -> &'static str {
        match self {
            Trip::Delivery => "deliveries",
            Trip::Pickup => "pickups",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Trip::Delivery => "Delivery",
            Trip::Pickup => "Pickup",
        }
    }
}

fn trip_filters(query: &mut QueryBuilder<'_, Postgres>, params: &TripQueryParams) {
    if let Some(status) = params.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(vehicle_id) = params.vehicle_id {
        query.push(" AND vehicle_id = ").push_bind(vehicle_id);
    }
    if let Some(date) = params.date {
        query.push(" AND scheduled_date = ").push_bind(date);
    }
    query.push(" ORDER BY scheduled_date ASC, id ASC");
}

/// Move a trip along its lifecycle, rejecting transitions that skip or go back.
async fn advance_trip(state: &AppState, trip: Trip, id: i64, next: TripStatus) -> Result<(), AppError> {
    let mut tx = state.db_pool.begin().await?;

    let current = sqlx::query_scalar::<_, TripStatus>(&format!("SELECT status FROM {} WHERE id = $1 FOR UPDATE", trip.table()))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", trip.label())))?;

    if !current.can_transition_to(next) {
        return Err(AppError::conflict(format!(
            "{} cannot move from {:?} to {:?}",
            trip.label(),
            current,
            next
        )));
    }

    sqlx::query(&format!("UPDATE {} SET status = $2 WHERE id = $1", trip.table()))
        .bind(id)
        .bind(next)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(trip = trip.table(), id, status = ?next, "Trip status updated");
    Ok(())
}

pub async fn create_delivery(
    State(state): State<AppState>,
    Json(req): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    if req.address.trim().is_empty() {
        return Err(AppError::validation("Delivery address is required"));
    }

    let delivery = sqlx::query_as::<_, Delivery>(&format!(
        "INSERT INTO deliveries (vehicle_id, sale_id, client_id, address, scheduled_date)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {DELIVERY_COLUMNS}"
    ))
    .bind(req.vehicle_id)
    .bind(req.sale_id)
    .bind(req.client_id)
    .bind(req.address.trim())
    .bind(req.scheduled_date)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate delivery", "Invalid vehicle_id, sale_id or client_id"))?;

    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(params): Query<TripQueryParams>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE 1=1"));
    trip_filters(&mut query, &params);
    let deliveries = query.build_query_as::<Delivery>().fetch_all(&state.db_pool).await?;
    Ok(Json(deliveries))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Delivery>, AppError> {
    sqlx::query_as::<_, Delivery>(&format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Delivery not found"))
}

pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTripStatusRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance_trip(&state, Trip::Delivery, id, req.status).await?;
    get_delivery(State(state), Path(id)).await
}

pub async fn create_pickup(
    State(state): State<AppState>,
    Json(req): Json<CreatePickupRequest>,
) -> Result<(StatusCode, Json<Pickup>), AppError> {
    if req.address.trim().is_empty() {
        return Err(AppError::validation("Pickup address is required"));
    }

    let pickup = sqlx::query_as::<_, Pickup>(&format!(
        "INSERT INTO pickups (vehicle_id, purchase_id, supplier_id, address, scheduled_date)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {PICKUP_COLUMNS}"
    ))
    .bind(req.vehicle_id)
    .bind(req.purchase_id)
    .bind(req.supplier_id)
    .bind(req.address.trim())
    .bind(req.scheduled_date)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Duplicate pickup", "Invalid vehicle_id, purchase_id or supplier_id"))?;

    Ok((StatusCode::CREATED, Json(pickup)))
}

pub async fn list_pickups(
    State(state): State<AppState>,
    Query(params): Query<TripQueryParams>,
) -> Result<Json<Vec<Pickup>>, AppError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {PICKUP_COLUMNS} FROM pickups WHERE 1=1"));
    trip_filters(&mut query, &params);
    let pickups = query.build_query_as::<Pickup>().fetch_all(&state.db_pool).await?;
    Ok(Json(pickups))
}

pub async fn get_pickup(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Pickup>, AppError> {
    sqlx::query_as::<_, Pickup>(&format!("SELECT {PICKUP_COLUMNS} FROM pickups WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Pickup not found"))
}

pub async fn update_pickup_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTripStatusRequest>,
) -> Result<Json<Pickup>, AppError> {
    advance_trip(&state, Trip::Pickup, id, req.status).await?;
    get_pickup(State(state), Path(id)).await
}

// ==================== Expenses ====================

pub async fn create_expense(
    State(state): State<AppState>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<LogisticsExpense>), AppError> {
    if req.amount <= 0.0 {
        return Err(AppError::validation("Expense amount must be greater than 0"));
    }

    let expense = sqlx::query_as::<_, LogisticsExpense>(&format!(
        "INSERT INTO logistics_expenses (vehicle_id, category, amount, expense_date, description)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {EXPENSE_COLUMNS}"
    ))
    .bind(req.vehicle_id)
    .bind(req.category)
    .bind(req.amount)
    .bind(req.expense_date)
    .bind(&req.description)
    .fetch_one(&state.db_pool)
    .await
    .map_err(map_vehicle_error)?;

    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<ExpenseQueryParams>,
) -> Result<Json<Vec<LogisticsExpense>>, AppError> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {EXPENSE_COLUMNS} FROM logistics_expenses WHERE 1=1"));
    if let Some(vehicle_id) = params.vehicle_id {
        query.push(" AND vehicle_id = ").push_bind(vehicle_id);
    }
    if let Some(from) = params.from {
        query.push(" AND expense_date >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        query.push(" AND expense_date <= ").push_bind(to);
    }
    query.push(" ORDER BY expense_date DESC, id DESC");

    let expenses = query.build_query_as::<LogisticsExpense>().fetch_all(&state.db_pool).await?;
    Ok(Json(expenses))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete expenses")?;

    let result = sqlx::query("DELETE FROM logistics_expenses WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Expense not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
