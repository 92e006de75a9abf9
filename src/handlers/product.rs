// src/handlers/product.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use crate::dtos::product::{CreateProductRequest, UpdateProductRequest, ProductResponse};
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;
use crate::error::AppError;
use tracing::{error, instrument};

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, cost, taxable, tax_rate, bulk_factor, bulk_unit_name, created_at";

fn validate_numbers(price: Option<f64>, tax_rate: Option<f64>, bulk_factor: Option<f64>) -> Result<(), AppError> {
    if price.is_some_and(|p| p < 0.0) {
        return Err(AppError::validation("Price cannot be negative"));
    }
    if tax_rate.is_some_and(|t| !(0.0..=1.0).contains(&t)) {
        return Err(AppError::validation("Tax rate must be between 0 and 1"));
    }
    if bulk_factor.is_some_and(|f| f <= 0.0) {
        return Err(AppError::validation("Bulk factor must be greater than 0"));
    }
    Ok(())
}

// GET /products - List all products
#[instrument(skip(state))]
pub async fn get_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, AppError> {
    match sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"))
        .fetch_all(&state.db_pool)
        .await {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/{id} - Get single product
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - Create new product
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    if payload.sku.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::validation("SKU and name are required"));
    }
    validate_numbers(Some(payload.price), Some(payload.tax_rate), payload.bulk_factor)?;
    if payload.cost < 0.0 {
        return Err(AppError::validation("Cost cannot be negative"));
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (sku, name, price, cost, taxable, tax_rate, bulk_factor, bulk_unit_name)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(payload.sku.trim())
    .bind(payload.name.trim())
    .bind(payload.price)
    .bind(payload.cost)
    .bind(payload.taxable)
    .bind(payload.tax_rate)
    .bind(payload.bulk_factor.unwrap_or(1.0))
    .bind(&payload.bulk_unit_name)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "SKU already exists", "Invalid product reference"))?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/{id} - Update product
#[instrument(skip(state, payload))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    validate_numbers(payload.price, payload.tax_rate, payload.bulk_factor)?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET
         sku = COALESCE($1, sku),
         name = COALESCE($2, name),
         price = COALESCE($3, price),
         taxable = COALESCE($4, taxable),
         tax_rate = COALESCE($5, tax_rate),
         bulk_factor = COALESCE($6, bulk_factor),
         bulk_unit_name = COALESCE($7, bulk_unit_name)
         WHERE id = $8 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(payload.sku.as_deref().map(str::trim))
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.price)
    .bind(payload.taxable)
    .bind(payload.tax_rate)
    .bind(payload.bulk_factor)
    .bind(payload.bulk_unit_name)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "SKU already exists", "Invalid product reference"))?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /products/{id} - Delete product
#[instrument(skip(state, auth))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth.require_manager("delete products")?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Product is in use", "Product is referenced by purchases, sales or lots"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
