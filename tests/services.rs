//! The demo services running behind a live gateway.

use axum::http::StatusCode;
use serde_json::{json, Value};

use service_gateway::config::ServiceConfig;
use service_gateway::services::orders::{self, OrderStore, OrdersState};
use service_gateway::services::users::{self, UserStore, UsersState};

use common::start_gateway;

mod common;

async fn start_users() -> String {
    common::start_router(users::router(UsersState::new("Users Service", UserStore::seeded()))).await
}

async fn start_orders(users_url: &str) -> String {
    let config = ServiceConfig {
        service_name: "Orders Service".to_string(),
        users_service_url: users_url.to_string(),
        dependency_timeout_ms: 1_000,
        health_timeout_ms: 500,
        ..ServiceConfig::default()
    };
    let state = OrdersState::new(&config, OrderStore::seeded()).unwrap();
    common::start_router(orders::router(state)).await
}

#[tokio::test]
async fn create_user_then_order_through_the_gateway() {
    let users_url = start_users().await;
    let orders_url = start_orders(&users_url).await;
    let gateway = start_gateway(common::gateway_config(&users_url, &orders_url)).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/users"))
        .json(&json!({"name": "Dora Lima", "email": "dora@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let user_id = body["user"]["id"].as_u64().unwrap();

    let res = client
        .post(gateway.url("/orders"))
        .json(&json!({"user_id": user_id, "items": ["Desk"], "total": 250.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["user_name"], "Dora Lima");

    let res = client
        .get(gateway.url(&format!("/orders/user/{}", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total_orders"], 1);
    assert_eq!(body["total_value"], 250.0);

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!((snapshot.group("users"), snapshot.group("orders")), (1, 2));
}

#[tokio::test]
async fn service_errors_pass_through_unchanged() {
    let users_url = start_users().await;
    let orders_url = start_orders(&users_url).await;
    let gateway = start_gateway(common::gateway_config(&users_url, &orders_url)).await;
    let client = common::client();

    let res = client
        .post(gateway.url("/users"))
        .json(&json!({"name": "Ana Again", "email": "ana.silva@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "Users Service");

    let res = client
        .post(gateway.url("/orders"))
        .json(&json!({"user_id": 999, "items": ["Desk"], "total": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(gateway.url("/orders"))
        .json(&json!({"user_id": 1, "items": ["Desk"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(gateway.state.forwarder.counters().snapshot().errors, 0);
}

#[tokio::test]
async fn orders_survive_a_users_outage() {
    let dead = common::dead_addr().await;
    let orders_url = start_orders(&format!("http://{}", dead)).await;
    let client = common::client();

    // Reads still work, just without enrichment.
    let body: Value = client
        .get(format!("{}/orders/1", orders_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["order"]["id"], 1);
    assert!(body["order"].get("user_name").is_none());

    // Creating needs the user, so the outage surfaces as 503.
    let res = client
        .post(format!("{}/orders", orders_url))
        .json(&json!({"user_id": 1, "items": ["Desk"], "total": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    // The service itself stays healthy and reports the dependency.
    let res = client.get(format!("{}/health", orders_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["dependencies"]["users_service"], "unreachable");
}

#[tokio::test]
async fn gateway_health_over_real_services() {
    let users_url = start_users().await;
    let orders_url = start_orders(&users_url).await;
    let gateway = start_gateway(common::gateway_config(&users_url, &orders_url)).await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["overall"], "healthy");
}
