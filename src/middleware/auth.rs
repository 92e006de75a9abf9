use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_SELLER: &str = "seller";
pub const ROLES: [&str; 3] = [ROLE_ADMIN, ROLE_MANAGER, ROLE_SELLER];

#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: String,
    pub email: String,
}

impl AuthContext {
    pub fn require_any(&self, roles: &[&str], action: &str) -> Result<(), AppError> {
        if roles.contains(&self.role.as_str()) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("Only {} can {}", roles.join("/"), action)))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Admins and managers: deletes, cancellations.
    pub fn require_manager(&self, action: &str) -> Result<(), AppError> {
        self.require_any(&[ROLE_ADMIN, ROLE_MANAGER], action)
    }
}

#[derive(Serialize)]
struct ErrorBody { error: String, code: &'static str }

/// Read an optional `Bearer` token. `Ok(None)` when no header is sent.
pub fn bearer_context(headers: &HeaderMap, secret: &str) -> Result<Option<AuthContext>, &'static str> {
    let auth_header = match headers.get(AUTHORIZATION) {
        Some(v) => v.to_str().map_err(|_| "Invalid Authorization format")?,
        None => return Ok(None),
    };

    // Expect "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or("Invalid Authorization format")?;

    let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;

    Ok(Some(AuthContext {
        user_id: claims.sub,
        role: claims.role,
        email: claims.email,
    }))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth = match bearer_context(req.headers(), &state.config.jwt_secret) {
        Ok(Some(auth)) => auth,
        Ok(None) => return unauthorized("Missing Authorization header"),
        Err(msg) => return unauthorized(msg),
    };

    req.extensions_mut().insert(auth);
    next.run(req).await
}

fn unauthorized(msg: &str) -> Response {
    let body = axum::Json(ErrorBody { error: msg.to_string(), code: "unauthorized" });
    (StatusCode::UNAUTHORIZED, body).into_response()
}
