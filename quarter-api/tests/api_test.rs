use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeDelta, Utc};
use http_body_util::BodyExt;
use quarter_api::{app, AppState};
use quarter_core::memory::{
    InMemoryAvailabilityStore, InMemoryReservationLedger, InMemoryUserRepository,
};
use quarter_core::{BookingService, ManualClock};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

// ─── Test helpers ───────────────────────────────────────────────────────

fn test_app() -> (Router, Arc<ManualClock>) {
    let now = DateTime::parse_from_rfc3339("2025-01-08T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let clock = Arc::new(ManualClock::new(now));
    let booking = BookingService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemoryAvailabilityStore::new()),
        Arc::new(InMemoryReservationLedger::new()),
    )
    .with_clock(clock.clone());

    (app(AppState::new(booking, Duration::from_secs(5))), clock)
}

fn api_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn api_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn create_user(app: &Router, role: &str) -> String {
    let (status, body) = send(app, api_request("POST", "/users", json!({ "role": role }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], role);
    body["id"].as_str().unwrap().to_string()
}

/// Provider with a 09:00-10:00 window on 2025-01-10, plus a client.
async fn seeded(app: &Router) -> (String, String) {
    let provider = create_user(app, "PROVIDER").await;
    let client = create_user(app, "CLIENT").await;

    let (status, _) = send(
        app,
        api_request(
            "POST",
            "/availability",
            json!({
                "provider_id": provider,
                "start": "2025-01-10T09:00:00Z",
                "end": "2025-01-10T10:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (provider, client)
}

fn reservation_body(provider: &str, client: &str, time: &str) -> Value {
    json!({
        "provider_id": provider,
        "client_id": client,
        "reservation_time": time,
    })
}

// ─── Users ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_user() {
    let (app, _) = test_app();
    let id = create_user(&app, "CLIENT").await;

    let (status, body) = send(&app, api_get(&format!("/users/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["role"], "CLIENT");
}

#[tokio::test]
async fn test_malformed_identifier_is_bad_request() {
    let (app, _) = test_app();

    let (status, body) = send(&app, api_get("/users/not-a-guid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_identifier");
    assert_eq!(body["kind"], "validation");
    assert_eq!(body["details"]["field"], "user_id");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (app, _) = test_app();

    let (status, body) = send(&app, api_get(&format!("/users/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "user_not_found");
}

// ─── Availability ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_client_cannot_publish_availability() {
    let (app, _) = test_app();
    let client = create_user(&app, "CLIENT").await;

    let (status, body) = send(
        &app,
        api_request(
            "POST",
            "/availability",
            json!({
                "provider_id": client,
                "start": "2025-01-10T09:00:00Z",
                "end": "2025-01-10T10:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "not_a_provider");
}

#[tokio::test]
async fn test_unaligned_window_rejected() {
    let (app, _) = test_app();
    let provider = create_user(&app, "PROVIDER").await;

    let (status, body) = send(
        &app,
        api_request(
            "POST",
            "/availability",
            json!({
                "provider_id": provider,
                "start": "2025-01-10T09:07:00Z",
                "end": "2025-01-10T10:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_slot_alignment");
    assert_eq!(body["details"]["field"], "start");
}

#[tokio::test]
async fn test_list_and_expand_availability() {
    let (app, _) = test_app();
    let (provider, _) = seeded(&app).await;

    let (status, body) = send(&app, api_get(&format!("/availability/{}", provider))).await;
    assert_eq!(status, StatusCode::OK);
    let windows = body.as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["start"], "2025-01-10T09:00:00Z");
    assert_eq!(windows[0]["end"], "2025-01-10T10:00:00Z");

    let (status, body) = send(
        &app,
        api_get(&format!(
            "/availability/{}?start=2025-01-10T09:15:00Z&end=2025-01-10T09:45:00Z&expand=true",
            provider
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listing = body.as_array().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(
        listing[0]["slots"],
        json!([
            "2025-01-10T09:00:00Z",
            "2025-01-10T09:15:00Z",
            "2025-01-10T09:30:00Z",
            "2025-01-10T09:45:00Z",
        ])
    );

    // A bound outside the window matches nothing.
    let (status, body) = send(
        &app,
        api_get(&format!("/availability/{}?end=2025-01-10T10:15:00Z", provider)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

// ─── Reservations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_reserve_confirm_flow() {
    let (app, _) = test_app();
    let (provider, client) = seeded(&app).await;

    let (status, created) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-10T09:15:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["confirmed"], false);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["expiration"], "2025-01-08T08:30:00Z");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        api_request("PATCH", &format!("/reservations/{}", id), json!({ "confirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirmed"], true);
    assert_eq!(body["status"], "CONFIRMED");

    let (status, body) = send(&app, api_get(&format!("/reservations/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirmed"], true);

    let (status, body) = send(
        &app,
        api_request("PATCH", &format!("/reservations/{}", id), json!({ "confirmed": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "confirmation_irreversible");
}

#[tokio::test]
async fn test_double_booking_conflict() {
    let (app, _) = test_app();
    let (provider, client) = seeded(&app).await;
    let other = create_user(&app, "CLIENT").await;

    let (status, _) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-10T09:30:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &other, "2025-01-10T09:30:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "slot_already_booked");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_expired_hold_frees_slot_and_blocks_confirmation() {
    let (app, clock) = test_app();
    let (provider, client) = seeded(&app).await;

    let (_, first) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-10T09:00:00Z"),
        ),
    )
    .await;
    let first_id = first["id"].as_str().unwrap().to_string();

    clock.advance(TimeDelta::minutes(31));

    let (status, body) = send(&app, api_get(&format!("/reservations/{}", first_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "EXPIRED");

    let (status, body) = send(
        &app,
        api_request(
            "PATCH",
            &format!("/reservations/{}", first_id),
            json!({ "confirmed": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "reservation_expired");

    let (status, _) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-10T09:00:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_policy_rejections_are_unprocessable() {
    let (app, _) = test_app();
    let (provider, client) = seeded(&app).await;

    // Inside the 24 hour lead time.
    let (status, body) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-09T07:45:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "insufficient_lead_time");
    assert_eq!(body["details"]["earliest"], "2025-01-09T08:00:00Z");

    // Outside the published window.
    let (status, body) = send(
        &app,
        api_request(
            "POST",
            "/reservations",
            reservation_body(&provider, &client, "2025-01-10T10:00:00Z"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_availability_for_slot");
}

#[tokio::test]
async fn test_unknown_reservation_is_not_found() {
    let (app, _) = test_app();

    let (status, body) = send(
        &app,
        api_request(
            "PATCH",
            &format!("/reservations/{}", uuid::Uuid::new_v4()),
            json!({ "confirmed": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "reservation_not_found");
}
