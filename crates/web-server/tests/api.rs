//! # Router tests for the report endpoints
//!
//! Every test drives `web_server::app` in-process with `tower::ServiceExt::oneshot`,
//! backed by the in-memory store, so no MongoDB is required.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use core_types::FieldErrors;
use database::{ConnectionState, InMemoryReportStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{app, AppState};

/// Helper: build the app around a shared in-memory store.
fn test_app(store: &Arc<InMemoryReportStore>) -> axum::Router {
    app(AppState::new(store.clone()))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// -- Liveness & health --------------------------------------------------------

#[tokio::test]
async fn root_returns_liveness_text() {
    let store = Arc::new(InMemoryReportStore::new());
    let response = test_app(&store).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Backend running");
}

#[tokio::test]
async fn health_reports_each_connection_state() {
    let store = Arc::new(InMemoryReportStore::new());
    for (state, code) in [
        (ConnectionState::Disconnected, 0),
        (ConnectionState::Connected, 1),
        (ConnectionState::Connecting, 2),
        (ConnectionState::Disconnecting, 3),
    ] {
        store.set_state(state);
        let response = test_app(&store).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "mongoState": code }));
    }
}

// -- POST /add ----------------------------------------------------------------

#[tokio::test]
async fn add_valid_report_returns_201_with_identity_and_timestamp() {
    let store = Arc::new(InMemoryReportStore::new());
    let before = Utc::now();
    let body = json!({ "form_data": { "fullName": "A", "orderId": 1234, "issue": "broken" } });

    let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Data saved");
    let data = &json["data"];
    assert!(!data["_id"].as_str().unwrap().is_empty());
    assert_eq!(data["fullName"], "A");
    assert_eq!(data["orderId"], 1234);
    assert_eq!(data["issue"], "broken");
    let created_at: DateTime<Utc> = data["createdAt"].as_str().unwrap().parse().unwrap();
    assert!(created_at >= before);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn add_accepts_flat_body_and_persists_report_problem() {
    let store = Arc::new(InMemoryReportStore::new());
    let body = json!({ "fullName": "A", "orderId": "1234", "issue": "broken", "reportProblem": "lid missing" });

    let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["orderId"], 1234);
    assert_eq!(json["data"]["reportProblem"], "lid missing");
}

#[tokio::test]
async fn add_missing_fields_returns_400_and_echoes_payload() {
    let store = Arc::new(InMemoryReportStore::new());
    let cases = [
        json!({ "form_data": { "orderId": 1234, "issue": "broken" } }),
        json!({ "form_data": { "fullName": "A", "issue": "broken" } }),
        json!({ "form_data": { "fullName": "A", "orderId": 1234 } }),
        json!({ "fullName": "", "orderId": 1234, "issue": "broken" }),
    ];

    for body in cases {
        let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["message"], "Missing fields fullName/orderId/issue");
        let expected_received = body.get("form_data").unwrap_or(&body);
        assert_eq!(&json["received"], expected_received);
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn add_with_empty_body_reports_empty_payload() {
    let store = Arc::new(InMemoryReportStore::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/add")
        .body(Body::empty())
        .unwrap();

    let response = test_app(&store).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["received"], json!({}));
    assert_eq!(json["details"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn add_with_uncastable_order_id_returns_field_details() {
    let store = Arc::new(InMemoryReportStore::new());
    let body = json!({ "fullName": "A", "orderId": "abc", "issue": "broken" });

    let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid report fields");
    assert!(json["details"]["orderId"].is_string());
}

#[tokio::test]
async fn add_with_malformed_json_returns_400() {
    let store = Arc::new(InMemoryReportStore::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = test_app(&store).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Malformed request body");
}

#[tokio::test]
async fn add_accepts_urlencoded_forms() {
    let store = Arc::new(InMemoryReportStore::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("fullName=Ada+L&orderId=5678&issue=wrong+size"))
        .unwrap();

    let response = test_app(&store).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["fullName"], "Ada L");
    assert_eq!(json["data"]["orderId"], 5678);
}

#[tokio::test]
async fn add_accepts_bracketed_urlencoded_forms() {
    let store = Arc::new(InMemoryReportStore::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/add")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "form_data%5BfullName%5D=Ada&form_data%5BorderId%5D=5678&form_data%5Bissue%5D=late",
        ))
        .unwrap();

    let response = test_app(&store).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["fullName"], "Ada");
    assert_eq!(json["data"]["orderId"], 5678);
    assert_eq!(json["data"]["issue"], "late");
}

#[tokio::test]
async fn add_while_store_not_connected_returns_503_with_state() {
    let store = Arc::new(InMemoryReportStore::new());
    let body = json!({ "fullName": "A", "orderId": 1234, "issue": "broken" });

    for (state, code) in [
        (ConnectionState::Disconnected, 0),
        (ConnectionState::Connecting, 2),
        (ConnectionState::Disconnecting, 3),
    ] {
        store.set_state(state);
        let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["message"], "DB not connected, try later");
        assert_eq!(json["mongoState"], code);
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn invalid_payload_is_reported_before_unavailability() {
    let store = Arc::new(InMemoryReportStore::new());
    store.set_state(ConnectionState::Disconnected);

    let response = test_app(&store)
        .oneshot(post_json("/add", &json!({ "issue": "broken" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_validation_failure_returns_500_with_field_details() {
    let store = Arc::new(InMemoryReportStore::new());
    let mut details = FieldErrors::new();
    details.insert("orderId", "must be a number");
    store.reject_writes_with(details).await;

    let body = json!({ "fullName": "A", "orderId": 1234, "issue": "broken" });
    let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["message"], "Error saving data");
    assert_eq!(json["error"]["name"], "ValidationError");
    assert!(json["error"]["message"].as_str().unwrap().contains("orderId"));
    assert_eq!(json["error"]["details"]["orderId"], "must be a number");
}

// -- GET /get -----------------------------------------------------------------

#[tokio::test]
async fn list_returns_reports_in_insertion_order() {
    let store = Arc::new(InMemoryReportStore::new());
    for issue in ["first", "second"] {
        let body = json!({ "fullName": "A", "orderId": 1234, "issue": issue });
        let response = test_app(&store).oneshot(post_json("/add", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = test_app(&store).oneshot(get("/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let issues: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["issue"].as_str().unwrap())
        .collect();
    assert_eq!(issues, ["first", "second"]);
}

#[tokio::test]
async fn list_failure_returns_500_with_error_detail() {
    let store = Arc::new(InMemoryReportStore::new());
    store.fail_reads();

    let response = test_app(&store).oneshot(get("/get")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Error fetching data");
    assert_eq!(json["error"]["name"], "MongoDecodeError");
}

// -- Misc ---------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let store = Arc::new(InMemoryReportStore::new());
    let response = test_app(&store).oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Not found");
}

#[tokio::test]
async fn cors_headers_are_present() {
    let store = Arc::new(InMemoryReportStore::new());
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://forms.example.com")
        .body(Body::empty())
        .unwrap();
    let response = test_app(&store).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
