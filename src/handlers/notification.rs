use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::dtos::notification::NotificationQuery;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::notification::Notification;
use crate::state::AppState;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"SELECT id, title, message, is_read, created_at
           FROM notifications
           WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(auth.user_id)
    .bind(params.unread_only)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(notifications))
}

/// Other users' notifications look the same as missing ones.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<Notification>, AppError> {
    sqlx::query_as::<_, Notification>(
        r#"UPDATE notifications SET is_read = TRUE
           WHERE id = $1 AND user_id = $2
           RETURNING id, title, message, is_read, created_at"#,
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .map(Json)
    .ok_or_else(|| AppError::not_found("Notification not found"))
}
