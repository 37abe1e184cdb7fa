use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_database::{BillingRecordFilter, ClinicStore, MemoryStore};
use shared_models::entities::AppointmentStatus;
use shared_utils::test_utils::{ClinicFixtures, JwtTestUtils, TestConfig, TestUser};

fn create_app() -> (Router, Arc<MemoryStore>, String) {
    let config = TestConfig::default();
    let (state, store) = config.to_state(ClinicFixtures::seed());
    let auth = JwtTestUtils::bearer(&TestUser::doctor("carlos@example.com"), &config.jwt_secret);
    (appointment_routes(state), store, auth)
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn billing_count(store: &MemoryStore) -> usize {
    store
        .list_billing_records(&BillingRecordFilter::default())
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_get_appointment() {
    let (app, _store, auth) = create_app();

    let (status, json) = send(app, Method::GET, "/123", Some(&auth), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 123);
    assert_eq!(json["status"], "confirmed");
}

#[tokio::test]
async fn test_get_missing_appointment() {
    let (app, _store, auth) = create_app();

    let (status, json) = send(app, Method::GET, "/999", Some(&auth), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Appointment not found");
}

#[tokio::test]
async fn test_complete_appointment_generates_billing() {
    let (app, store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PUT,
        "/123/status",
        Some(&auth),
        Some(json!({ "status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["appointment"]["status"], "completed");
    assert!(json["appointment"]["completed_at"].is_string());
    assert_eq!(json["billing_record"]["amount"], 250.0);
    assert_eq!(json["billing_record"]["insurance_tax_id"], ClinicFixtures::UNIMED_TAX_ID);
    assert_eq!(json["billing_record"]["status"], "Pending");

    assert_eq!(billing_count(&store).await, 1);
}

#[tokio::test]
async fn test_patch_accepts_camel_case_fields() {
    let (app, store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PATCH,
        "/125/status",
        Some(&auth),
        Some(json!({
            "status": "completed",
            "completionTimestamp": "2024-01-01T10:15:00Z",
            "finalizedMarker": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["appointment"]["completed_at"], "2024-01-01T10:15:00Z");
    assert_eq!(json["appointment"]["finalized"], true);
    assert!(json["billing_record"]["insurance_id"].is_null());

    let stored = store.find_appointment(125).await.unwrap().unwrap();
    assert!(stored.finalized);
}

#[tokio::test]
async fn test_cancellation_does_not_bill() {
    let (app, store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PUT,
        "/123/status",
        Some(&auth),
        Some(json!({ "status": "cancelled", "cancellationReason": "Doctor unavailable" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Appointment status updated");
    assert_eq!(json["appointment"]["cancellation_reason"], "Doctor unavailable");
    assert!(json["billing_record"].is_null());
    assert_eq!(billing_count(&store).await, 0);
}

#[tokio::test]
async fn test_billing_failure_is_generic_and_rolls_back() {
    for appointment_id in [124, 126, 127, 128] {
        let (app, store, auth) = create_app();

        let (status, json) = send(
            app,
            Method::PUT,
            &format!("/{}/status", appointment_id),
            Some(&auth),
            Some(json!({ "status": "completed" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "appointment {}", appointment_id);
        assert_eq!(json["error"], "Failed to generate billing for appointment");

        let stored = store.find_appointment(appointment_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.completed_at, None);
        assert_eq!(billing_count(&store).await, 0);
    }
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let (app, store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PUT,
        "/123/status",
        Some(&auth),
        Some(json!({ "status": "done" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unknown appointment status: done");

    let stored = store.find_appointment(123).await.unwrap().unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_update_missing_appointment() {
    let (app, _store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PUT,
        "/999/status",
        Some(&auth),
        Some(json!({ "status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Appointment not found");
}

#[tokio::test]
async fn test_status_update_requires_valid_token() {
    let (app, store, _auth) = create_app();
    let forged = format!(
        "Bearer {}",
        JwtTestUtils::create_invalid_signature_token(&TestUser::default())
    );

    let (status, json) = send(
        app.clone(),
        Method::PUT,
        "/123/status",
        Some(&forged),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid token signature");

    let (status, _json) = send(
        app,
        Method::PUT,
        "/123/status",
        None,
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(billing_count(&store).await, 0);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let cases = [
        json!({ "finalized": true }),
        json!({ "status": "completed", "completionTimestamp": "2024-01-01" }),
        json!({ "status": 7 }),
    ];

    for body in cases {
        let (app, store, auth) = create_app();
        let (status, json) = send(app, Method::PUT, "/123/status", Some(&auth), Some(body.clone())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert!(json["error"].is_string(), "body {} gave {}", body, json);

        let stored = store.find_appointment(123).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(billing_count(&store).await, 0);
    }
}

#[tokio::test]
async fn test_missing_status_names_the_field() {
    let (app, _store, auth) = create_app();

    let (status, json) = send(
        app,
        Method::PATCH,
        "/123/status",
        Some(&auth),
        Some(json!({ "finalized": true })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("status"));
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let (app, _store, auth) = create_app();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/123/status")
        .header(AUTHORIZATION, &auth)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("status=completed"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_non_numeric_appointment_id_is_bad_request() {
    let (app, _store, auth) = create_app();

    let (status, json) = send(app.clone(), Method::GET, "/abc", Some(&auth), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = send(
        app,
        Method::PUT,
        "/abc/status",
        Some(&auth),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}
