//! End-to-end purchase, sale and credit flows through the router.
//! Runs only when TEST_DATABASE_URL points at a scratch PostgreSQL database.

mod common;

use agroerp_backend::auth::jwt::sign_token;
use common::{close, unique, TestApp, SECRET};
use http::{Method, StatusCode};
use serde_json::json;
use tokio::task::JoinSet;

#[tokio::test]
async fn completing_a_purchase_creates_lots_at_real_cost() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let seed = app.product(15.0).await;
    let feed = app.product(60.0).await;

    let (status, purchase) = app
        .call(
            Method::POST,
            "/purchases",
            Some(json!({
                "supplier_id": supplier,
                "branch_id": branch,
                "payment_method": "Efectivo",
                "items": [
                    { "product_id": seed, "quantity": 10.0, "unit_cost": 5.0 },
                    { "product_id": feed, "quantity": 5.0, "unit_cost": 30.0 },
                ],
                "associated_costs": [{ "description": "Flete", "amount": 40.0, "prorate": true }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{purchase}");
    assert!(close(purchase["total"].as_f64().unwrap(), 240.0));
    let id = purchase["id"].as_i64().unwrap();

    let (status, body) = app.call(Method::POST, &format!("/purchases/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["purchase"]["status"], "Completada");
    let lots = body["lots"].as_array().unwrap();
    assert_eq!(lots.len(), 2);
    let cost_of = |product: i64| {
        lots.iter()
            .find(|lot| lot["product_id"].as_i64() == Some(product))
            .and_then(|lot| lot["real_unit_cost"].as_f64())
            .unwrap()
    };
    // subtotals 50 and 150 take 10 and 30 of the freight
    assert!(close(cost_of(seed), 6.0));
    assert!(close(cost_of(feed), 36.0));

    let (_, product) = app.call(Method::GET, &format!("/products/{seed}"), None).await;
    assert!(close(product["cost"].as_f64().unwrap(), 6.0));

    let (_, stock) = app
        .call(Method::GET, &format!("/inventory?branch_id={branch}&product_id={seed}"), None)
        .await;
    let stock = stock.as_array().unwrap();
    assert_eq!(stock.len(), 1);
    assert!(close(stock[0]["quantity"].as_f64().unwrap(), 10.0));
    assert!(close(stock[0]["unit_price"].as_f64().unwrap(), 6.0));

    let (status, body) = app.call(Method::POST, &format!("/purchases/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn credit_purchase_reserves_and_cancel_releases() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 1000.0).await;
    let product = app.product(30.0).await;

    let order = |quantity: f64| {
        json!({
            "supplier_id": supplier,
            "branch_id": branch,
            "payment_method": "Crédito",
            "items": [{ "product_id": product, "quantity": quantity, "unit_cost": 20.0 }],
        })
    };

    let (status, purchase) = app.call(Method::POST, "/purchases", Some(order(10.0))).await;
    assert_eq!(status, StatusCode::CREATED, "{purchase}");
    assert!(close(app.credit_used("suppliers", supplier).await, 200.0));

    let (status, body) = app.call(Method::POST, "/purchases", Some(order(50.0))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["code"], "insufficient_credit");
    assert!(close(app.credit_used("suppliers", supplier).await, 200.0));

    let id = purchase["id"].as_i64().unwrap();
    let (status, body) = app.call(Method::POST, &format!("/purchases/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Cancelada");
    assert!(close(app.credit_used("suppliers", supplier).await, 0.0));
}

#[tokio::test]
async fn sales_draw_from_the_oldest_lots_first() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let product = app.product(20.0).await;
    app.receive(supplier, branch, product, 5.0, 10.0).await;
    app.receive(supplier, branch, product, 10.0, 12.0).await;

    let (status, sale) = app
        .call(
            Method::POST,
            "/sales",
            Some(json!({
                "branch_id": branch,
                "payment_method": "Efectivo",
                "items": [{ "product_id": product, "quantity": 7.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert!(close(sale["totals"]["subtotal"].as_f64().unwrap(), 140.0));
    assert!(close(sale["totals"]["cost"].as_f64().unwrap(), 74.0));
    assert!(close(sale["totals"]["margin"].as_f64().unwrap(), 66.0));
    assert_eq!(app.lot_quantities(branch, product).await, vec![0.0, 8.0]);

    let sale_id = sale["id"].as_i64().unwrap();
    let allocations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sale_lot_allocations a
         JOIN sale_items i ON i.id = a.sale_item_id
         WHERE i.sale_id = $1",
    )
    .bind(sale_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(allocations, 2);

    let (status, body) = app
        .call(
            Method::POST,
            "/sales",
            Some(json!({
                "branch_id": branch,
                "payment_method": "Efectivo",
                "items": [{ "product_id": product, "quantity": 100.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["code"], "insufficient_stock");
    assert_eq!(app.lot_quantities(branch, product).await, vec![0.0, 8.0]);
}

#[tokio::test]
async fn cancelling_a_sale_restores_lots_and_credit() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let client = app.party("clients", 500.0).await;
    let product = app.product(20.0).await;
    app.receive(supplier, branch, product, 10.0, 8.0).await;

    let (status, sale) = app
        .call(
            Method::POST,
            "/sales",
            Some(json!({
                "client_id": client,
                "branch_id": branch,
                "payment_method": "Crédito",
                "items": [{ "product_id": product, "quantity": 4.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert!(close(app.credit_used("clients", client).await, 80.0));
    assert_eq!(app.lot_quantities(branch, product).await, vec![6.0]);

    let id = sale["id"].as_i64().unwrap();
    let (status, body) = app.call(Method::POST, &format!("/sales/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Cancelada");
    assert!(close(app.credit_used("clients", client).await, 0.0));
    assert_eq!(app.lot_quantities(branch, product).await, vec![10.0]);

    let (status, _) = app.call(Method::POST, &format!("/sales/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn payments_and_limits_respect_credit_in_use() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let client = app.party("clients", 500.0).await;
    let product = app.product(20.0).await;
    app.receive(supplier, branch, product, 10.0, 8.0).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/sales",
            Some(json!({
                "client_id": client,
                "branch_id": branch,
                "payment_method": "Crédito",
                "items": [{ "product_id": product, "quantity": 4.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let payments = format!("/clients/{client}/payments");
    let (status, body) = app.call(Method::POST, &payments, Some(json!({ "amount": 100.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(close(app.credit_used("clients", client).await, 80.0));

    let (status, body) = app.call(Method::POST, &payments, Some(json!({ "amount": 30.0 }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(close(app.credit_used("clients", client).await, 50.0));

    let party = format!("/clients/{client}");
    let (status, body) = app.call(Method::PUT, &party, Some(json!({ "credit_limit": 40.0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, body) = app.call(Method::PUT, &party, Some(json!({ "credit_limit": 50.0 }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(close(body["credit_limit"].as_f64().unwrap(), 50.0));
}

#[tokio::test]
async fn free_credit_sales_are_rejected() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let client = app.party("clients", 500.0).await;
    let product = app.product(20.0).await;
    app.receive(supplier, branch, product, 10.0, 8.0).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/sales",
            Some(json!({
                "client_id": client,
                "branch_id": branch,
                "payment_method": "Crédito",
                "items": [{ "product_id": product, "quantity": 2.0, "unit_price": 0.0 }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().contains("positive total"));
    assert_eq!(app.lot_quantities(branch, product).await, vec![10.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sales_listing_products_in_opposite_order_do_not_deadlock() {
    let Some(app) = TestApp::start().await else { return };
    let branch = app.branch().await;
    let supplier = app.party("suppliers", 0.0).await;
    let first = app.product(5.0).await;
    let second = app.product(5.0).await;
    app.receive(supplier, branch, first, 1000.0, 1.0).await;
    app.receive(supplier, branch, second, 1000.0, 1.0).await;

    let mut sales = JoinSet::new();
    for n in 0..40 {
        let (a, b) = if n % 2 == 0 { (first, second) } else { (second, first) };
        let body = json!({
            "branch_id": branch,
            "payment_method": "Efectivo",
            "items": [
                { "product_id": a, "quantity": 1.0 },
                { "product_id": b, "quantity": 1.0 },
            ],
        });
        let app = app.clone();
        sales.spawn(async move { app.call(Method::POST, "/sales", Some(body)).await });
    }

    while let Some(joined) = sales.join_next().await {
        let (status, body) = joined.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
    assert_eq!(app.lot_quantities(branch, first).await, vec![960.0]);
    assert_eq!(app.lot_quantities(branch, second).await, vec![960.0]);
}

#[tokio::test]
async fn anonymous_callers_only_register_sellers() {
    let Some(app) = TestApp::start().await else { return };
    let register = |role: Option<&str>| {
        let mut body = json!({
            "email": format!("{}@agro.test", unique("user")),
            "password": "cosecha-2024",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        body
    };

    let (status, body) = app.call_as(None, Method::POST, "/users/register", Some(register(Some("admin")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = app.call_as(None, Method::POST, "/users/register", Some(register(None))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "seller");

    let admin = sign_token(1, "admin", "root@agro.test", SECRET, 1).unwrap();
    let (status, body) = app
        .call_as(Some(&admin), Method::POST, "/users/register", Some(register(Some("manager"))))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "manager");
}
