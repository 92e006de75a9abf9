use sqlx::PgPool;

/// Insert a notification for `user_id` on a background task.
///
/// Fire-and-forget: the caller has already committed its own work, so a
/// failure here is only logged.
pub fn spawn_notification(pool: PgPool, user_id: i64, title: String, message: String) {
    tokio::spawn(async move {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, title, message) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(&title)
        .bind(&message)
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(user_id, %title, error=%e, "Failed to store notification");
        }
    });
}
