use bcrypt::{hash, verify, DEFAULT_COST};
use crate::dtos::user::{RegisterUserRequest, UserResponse, LoginRequest, LoginResponse};
use crate::auth::jwt::sign_token;
use crate::error::AppError;
use axum::{extract::State, http::HeaderMap, Json};
use crate::state::AppState;
use crate::middleware::auth::{bearer_context, AuthContext, ROLES, ROLE_SELLER};
use crate::models::user::User;
use axum::extract::Extension;
use tracing::instrument;

const USER_COLUMNS: &str = "id, email, password_hash, display_name, role, is_active, created_at";

#[instrument(skip_all)]
pub async fn register_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterUserRequest>
) -> Result<(axum::http::StatusCode, Json<UserResponse>), AppError> {
    // Basic validation
    if !ROLES.contains(&payload.role.as_str()) {
        return Err(AppError::validation("Invalid role"));
    }

    let caller = bearer_context(&headers, &state.config.jwt_secret).map_err(|msg| AppError::unauthorized(msg))?;
    let privileged = payload.role != ROLE_SELLER;
    if privileged {
        if let Some(caller) = &caller {
            if !caller.is_admin() {
                return Err(AppError::forbidden("Only admin can create admin or manager accounts"));
            }
        }
    }

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Valid email required"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password too short"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    let mut tx = state.db_pool.begin().await?;

    // Without an admin token a privileged account is only allowed as the
    // very first user; the table lock keeps two bootstraps from racing.
    if privileged && caller.is_none() {
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let has_users: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&mut *tx)
            .await?;
        if has_users {
            return Err(AppError::forbidden("Only admin can create admin or manager accounts"));
        }
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, display_name, role)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(&email)
    .bind(&password_hash)
    .bind(&payload.display_name)
    .bind(&payload.role)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "Email already registered", "Invalid user reference"))?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");
    Ok((axum::http::StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip_all)]
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>
) -> Result<Json<LoginResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("Email required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(&email)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(AppError::conflict("User inactive"));
    }

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;

    if !ok {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let ttl_hours = state.config.token_ttl_hours;
    let token = sign_token(user.id, &user.role, &user.email, &state.config.jwt_secret, ttl_hours)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in_seconds: ttl_hours * 60 * 60,
    }))
}

// Authenticated endpoint: returns full user profile from DB using the id in AuthContext
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(auth.user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
