//! End-to-end forwarding behaviour through a live gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{Reply, start_gateway, start_mock_backend, start_programmable_backend};

mod common;

#[tokio::test]
async fn backend_404_is_relayed_verbatim() {
    let users = start_mock_backend(Reply::json(404, r#"{"error":"not found"}"#)).await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;

    let res = common::client().get(gateway.url("/users/42")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), r#"{"error":"not found"}"#);

    let seen = users.received();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].target, "/users/42");
}

#[tokio::test]
async fn counters_move_once_per_request_whatever_the_outcome() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let users = start_programmable_backend(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            match n {
                0 => Reply::json(200, r#"{"users":[]}"#),
                1 => Reply::json(404, r#"{"error":"missing"}"#),
                _ => Reply::json(500, r#"{"error":"boom"}"#),
            }
        }
    })
    .await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;
    let client = common::client();

    let mut statuses = Vec::new();
    for path in ["/users", "/users/9", "/users/search/ana"] {
        statuses.push(client.get(gateway.url(path)).send().await.unwrap().status().as_u16());
    }
    assert_eq!(statuses, vec![200, 404, 500]);

    // Backend-reported errors are not gateway errors.
    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.group("users"), 3);
    assert_eq!(snapshot.group("orders"), 0);
    assert_eq!(snapshot.errors, 0);

    let stats: Value = client.get(gateway.url("/stats")).send().await.unwrap().json().await.unwrap();
    assert_eq!(
        stats["request_statistics"],
        json!({"total": 3, "users": 3, "orders": 0, "errors": 0})
    );
    assert_eq!(stats["success_rate"], "100.00%");
}

#[tokio::test]
async fn post_rejected_by_backend_is_relayed_and_counted() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(400, r#"{"error":"user_id, items and total are required"}"#)).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;

    let sent = r#"{"user_id":1,"items":["Keyboard"]}"#;
    let res = common::client()
        .post(gateway.url("/orders"))
        .header("content-type", "application/json")
        .body(sent)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"user_id, items and total are required"}"#);

    let seen = orders.received();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].body, sent.as_bytes());
    assert_eq!(seen[0].header("content-type"), Some("application/json"));

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!((snapshot.total, snapshot.group("orders"), snapshot.errors), (1, 1, 0));
}

#[tokio::test]
async fn slow_backend_times_out_with_504() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, r#"{"order":{}}"#).delayed(Duration::from_secs(2))).await;
    let mut config = common::gateway_config(&users.url(), &orders.url());
    config.timeouts.data_ms = 200;
    let gateway = start_gateway(config).await;

    let res = common::client().get(gateway.url("/orders/5")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "orders");
    assert_eq!(body["error"], "Timeout connecting to service");
    assert_eq!(body["gateway"], "API Gateway");
    assert!(body["timestamp"].is_string());

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!(snapshot.errors, 1);
    assert_eq!(snapshot.group("orders"), 1);
}

#[tokio::test]
async fn request_deadline_answers_json_504_and_counts_once() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, r#"{"order":{}}"#).delayed(Duration::from_secs(3))).await;
    let mut config = common::gateway_config(&users.url(), &orders.url());
    config.timeouts.request_secs = 1;
    config.timeouts.data_ms = 5000;
    let gateway = start_gateway(config).await;

    let res = common::client().get(gateway.url("/orders/5")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "orders");
    assert_eq!(body["error"], "Timeout connecting to service");
    assert_eq!(body["gateway"], "API Gateway");
    assert!(body["timestamp"].is_string());

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!((snapshot.total, snapshot.group("orders"), snapshot.errors), (1, 1, 1));
}

#[tokio::test]
async fn unparseable_backend_response_is_500() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = common::start_raw_backend(b"garbage\r\n\r\n").await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &format!("http://{}", orders))).await;

    let res = common::client().get(gateway.url("/orders/5")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "orders");
    assert!(body["error"].as_str().unwrap().starts_with("Error processing request"));

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!((snapshot.total, snapshot.group("orders"), snapshot.errors), (1, 1, 1));
}

#[tokio::test]
async fn oversized_post_is_413_and_counted() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(201, "{}")).await;
    let mut config = common::gateway_config(&users.url(), &orders.url());
    config.limits.max_body_bytes = 8;
    let gateway = start_gateway(config).await;

    let sent = r#"{"user_id":1,"items":["Keyboard"]}"#;
    let res = common::client()
        .post(gateway.url("/orders"))
        .header("content-type", "application/json")
        .body(sent)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["gateway"], "API Gateway");
    assert!(orders.received().is_empty());

    let snapshot = gateway.state.forwarder.counters().snapshot();
    assert_eq!((snapshot.total, snapshot.group("orders"), snapshot.errors), (1, 1, 1));
}

#[tokio::test]
async fn unreachable_backend_is_503() {
    let dead = common::dead_addr().await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&format!("http://{}", dead), &orders.url())).await;

    let res = common::client().delete(gateway.url("/users/1")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["service"], "users");
    assert_eq!(body["error"], "Service unavailable");
    assert_eq!(gateway.state.forwarder.counters().snapshot().errors, 1);
}

#[tokio::test]
async fn query_and_request_id_reach_the_backend() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;

    let res = common::client()
        .get(gateway.url("/orders/status/pending?page=2"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    let seen = orders.received();
    assert_eq!(seen[0].target, "/orders/status/pending?page=2");
    assert_eq!(seen[0].header("x-request-id"), Some("trace-me"));
}

#[tokio::test]
async fn body_is_dropped_for_delete() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;

    common::client()
        .delete(gateway.url("/users/3"))
        .body(r#"{"ignored":true}"#)
        .send()
        .await
        .unwrap();

    let seen = users.received();
    assert_eq!(seen[0].method, "DELETE");
    assert!(seen[0].body.is_empty());
}

#[tokio::test]
async fn unmatched_and_wrong_method_are_answered_locally() {
    let users = start_mock_backend(Reply::json(200, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;
    let client = common::client();

    let res = client.get(gateway.url("/products/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Endpoint not found in gateway");
    assert_eq!(body["path"], "/products/1");

    let res = client.post(gateway.url("/users/search/ana")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET");

    assert!(users.received().is_empty());
    assert_eq!(gateway.state.forwarder.counters().snapshot().total, 0);
}

#[tokio::test]
async fn malformed_json_body_is_400_before_forwarding() {
    let users = start_mock_backend(Reply::json(201, "{}")).await;
    let orders = start_mock_backend(Reply::json(200, "{}")).await;
    let gateway = start_gateway(common::gateway_config(&users.url(), &orders.url())).await;

    let res = common::client()
        .post(gateway.url("/users"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(users.received().is_empty());
}
