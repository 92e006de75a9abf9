//! Runs only when TEST_DATABASE_URL points at a scratch PostgreSQL database.

mod common;

use agroerp_backend::services::credit::{reserve_credit, Counterparty};
use common::test_pool;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_credit_purchases_respect_the_limit() {
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let supplier_id: i64 = sqlx::query_scalar(
        "INSERT INTO suppliers (name, credit_limit) VALUES ('Semillas del Norte', 1000) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = pool.begin().await.unwrap();
            match reserve_credit(&mut *tx, Counterparty::Supplier, supplier_id, 150.0).await {
                Ok(_) => {
                    tx.commit().await.unwrap();
                    true
                }
                Err(_) => false,
            }
        }));
    }

    let mut committed = 0;
    for h in handles {
        if h.await.unwrap() {
            committed += 1;
        }
    }

    let used: f64 = sqlx::query_scalar("SELECT credit_used FROM suppliers WHERE id = $1")
        .bind(supplier_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(committed, 6);
    assert!((used - 900.0).abs() < 1e-9);

    sqlx::query("DELETE FROM suppliers WHERE id = $1").bind(supplier_id).execute(&pool).await.unwrap();
}
