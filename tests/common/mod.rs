//! Shared setup for the tests that need PostgreSQL. Every test seeds its own
//! branch, products and counterparties so tests can run side by side.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use agroerp_backend::{auth::jwt::sign_token, build_app, config::Config, state::AppState};
use axum::body::Body;
use axum::Router;
use http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Short suffix that is unique across runs against the same database.
pub fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("{prefix}-{nanos}-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new().max_connections(10).connect(&url).await.ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
}

#[derive(Clone)]
pub struct TestApp {
    pub pool: PgPool,
    pub router: Router,
    /// Token of a freshly inserted manager
    pub token: String,
}

impl TestApp {
    pub async fn start() -> Option<TestApp> {
        let pool = test_pool().await?;
        let email = format!("{}@agro.test", unique("manager"));
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, 'x', 'manager') RETURNING id",
        )
        .bind(&email)
        .fetch_one(&pool)
        .await
        .unwrap();

        let config = Config {
            database_url: String::new(),
            jwt_secret: SECRET.into(),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            token_ttl_hours: 1,
            db_max_connections: 10,
        };
        let router = build_app(AppState::new(pool.clone(), config));
        let token = sign_token(user_id, "manager", &email, SECRET, 1).unwrap();
        Some(TestApp { pool, router, token })
    }

    pub async fn call(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(Some(&self.token), method, path, body).await
    }

    pub async fn call_as(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(format!("/AgroERP{path}"));
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    pub async fn branch(&self) -> i64 {
        let (status, body) = self
            .call(Method::POST, "/branches", Some(json!({ "name": unique("Sucursal") })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn product(&self, price: f64) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/products",
                Some(json!({ "sku": unique("SKU"), "name": unique("Fertilizante"), "price": price })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn party(&self, kind: &str, credit_limit: f64) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/{kind}"),
                Some(json!({ "name": unique(kind), "credit_limit": credit_limit })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn credit_used(&self, kind: &str, id: i64) -> f64 {
        let (status, body) = self.call(Method::GET, &format!("/{kind}/{id}"), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["credit_used"].as_f64().unwrap()
    }

    /// Receive `quantity` units at `unit_cost` through a cash purchase.
    pub async fn receive(&self, supplier_id: i64, branch_id: i64, product_id: i64, quantity: f64, unit_cost: f64) {
        let (status, body) = self
            .call(
                Method::POST,
                "/purchases",
                Some(json!({
                    "supplier_id": supplier_id,
                    "branch_id": branch_id,
                    "payment_method": "Efectivo",
                    "items": [{ "product_id": product_id, "quantity": quantity, "unit_cost": unit_cost }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["id"].as_i64().unwrap();

        let (status, body) = self.call(Method::POST, &format!("/purchases/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Remaining quantity of each lot of a product at a branch, oldest first.
    pub async fn lot_quantities(&self, branch_id: i64, product_id: i64) -> Vec<f64> {
        let (status, body) = self
            .call(Method::GET, &format!("/inventory?branch_id={branch_id}&product_id={product_id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body.as_array()
            .unwrap()
            .iter()
            .map(|lot| lot["quantity"].as_f64().unwrap())
            .collect()
    }
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
