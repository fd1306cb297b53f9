//! Integration tests for the StudioBook API
//!
//! The first group runs against a pool that never connects: liveness,
//! documentation, authentication rejection and the unreachable-store
//! health check.
//!
//! The second group needs PostgreSQL (`DATABASE_URL`) and is skipped
//! without it:
//! - Studio create/get round trip
//! - Overlapping reservations (one accepted, one `STUDIO_CONFLICT`)
//! - Empty range, abutting reservations
//! - Equipment holds and their release on cancellation
//! - Idempotent updates, status permissions, payments
//! - Rescheduling with equipment and re-quoted prices
//! - Payment retries and status updates

mod common;

use axum::http::{Method, StatusCode};
use common::{offline_app, rate_limited_app, send, TestContext, TestUser};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use studiobook_shared::models::user::UserRole;

const DAY: &str = "2030-06-03";

fn at(time: &str) -> String {
    format!("{DAY}T{time}:00Z")
}

fn weekly_schedule() -> Value {
    let days: Vec<Value> = (0..7)
        .map(|day| json!({ "day_of_week": day, "open_time": "09:00:00", "close_time": "22:00:00" }))
        .collect();
    Value::Array(days)
}

fn studio_body() -> Value {
    json!({
        "name": "Room A",
        "description": "Live room with booth",
        "address": "1 Main St",
        "city": "Berlin",
        "postal_code": "10115",
        "country": "DE",
        "capacity": 6,
        "hourly_rate_cents": 5000,
        "availability": weekly_schedule()
    })
}

async fn create_studio(ctx: &TestContext, owner: &TestUser) -> String {
    let (status, body) = ctx
        .send(Method::POST, "/api/v1/studios", Some(owner), Some(studio_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn book(
    ctx: &TestContext,
    user: &TestUser,
    studio_id: &str,
    start: &str,
    end: &str,
    equipment: Value,
) -> (StatusCode, Value) {
    ctx.send(
        Method::POST,
        "/api/v1/bookings",
        Some(user),
        Some(json!({
            "studio_id": studio_id,
            "start_time": at(start),
            "end_time": at(end),
            "equipment": equipment
        })),
    )
    .await
}

async fn add_microphone(ctx: &TestContext, owner: &TestUser, studio_id: &str) -> String {
    let (status, mic) = ctx
        .send(
            Method::POST,
            "/api/v1/equipment",
            Some(owner),
            Some(json!({
                "studio_id": studio_id,
                "name": "U87",
                "equipment_type": "MICROPHONE",
                "hourly_rate_cents": 1000
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{mic}");
    mic["data"]["id"].as_str().unwrap().to_string()
}

async fn confirm(ctx: &TestContext, owner: &TestUser, id: &str) {
    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/bookings/{id}"),
            Some(owner),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

fn timestamp(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

fn instant(time: &str) -> DateTime<Utc> {
    at(time).parse().unwrap()
}

// ---------------------------------------------------------------------------
// Without a database
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_liveness_does_not_touch_store() {
    let (status, body) = send(&offline_app(), Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_database_health_unreachable_store() {
    let (status, body) = send(&offline_app(), Method::GET, "/api/health/db", None, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_docs_payload() {
    let (status, body) = send(&offline_app(), Method::GET, "/api", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "StudioBook API");
    assert!(body["data"]["endpoints"]["bookings"].is_object());
}

#[tokio::test]
async fn test_unauthenticated_booking_rejected() {
    let app = offline_app();

    for uri in ["/api/v1/bookings", "/api/bookings"] {
        let (status, body) = send(
            &app,
            Method::POST,
            uri,
            None,
            Some(json!({ "studio_id": uuid::Uuid::new_v4() })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (status, body) = send(
        &offline_app(),
        Method::GET,
        "/api/v1/auth/profile",
        Some("Bearer not-a-jwt".to_string()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let (status, body) = send(&offline_app(), Method::GET, "/api/v1/nothing-here", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rate_limit_keys_on_peer_address() {
    use axum::{body::Body, extract::ConnectInfo, http::Request};
    use std::net::{Ipv6Addr, SocketAddr};
    use tower::ServiceExt;

    let Some(app) = rate_limited_app(2).await else { return };

    // Fresh address per run so counters from earlier runs do not interfere
    let peer = SocketAddr::from((Ipv6Addr::from(uuid::Uuid::new_v4().as_u128()), 4000));

    let mut statuses = Vec::new();
    for hop in 1..=4 {
        let mut request = Request::builder()
            .uri("/api")
            .header("x-forwarded-for", format!("10.9.9.{hop}"))
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let response = app.clone().oneshot(request).await.unwrap();
        statuses.push(response.status());
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

// ---------------------------------------------------------------------------
// With a database
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_studio_round_trip() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;

    let studio_id = create_studio(&ctx, &owner).await;

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/studios/{studio_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let studio = &body["data"];
    assert_eq!(studio["name"], "Room A");
    assert_eq!(studio["city"], "Berlin");
    assert_eq!(studio["capacity"], 6);
    assert_eq!(studio["hourly_rate_cents"], 5000);
    assert_eq!(studio["currency"], "EUR");
    assert_eq!(studio["owner_id"], owner.user.id.to_string());
    assert_eq!(studio["availability"].as_array().unwrap().len(), 7);

    ctx.cleanup(&[&owner]).await;
}

#[tokio::test]
async fn test_artist_cannot_create_studio() {
    let Some(ctx) = TestContext::new().await else { return };
    let artist = ctx.create_user(UserRole::Artist).await;

    let (status, body) = ctx
        .send(Method::POST, "/api/v1/studios", Some(&artist), Some(studio_body()))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    ctx.cleanup(&[&artist]).await;
}

#[tokio::test]
async fn test_overlapping_reservation_conflicts() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (status, first) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["data"]["status"], "PENDING");
    assert_eq!(first["data"]["total_price_cents"], 10_000);

    let (status, second) = book(&ctx, &artist, &studio_id, "11:00", "13:00", json!([])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["code"], "STUDIO_CONFLICT");
    assert_eq!(second["details"]["reservation_id"], first["data"]["id"]);

    // The owner is told about the new request
    let (_, notifications) = ctx
        .send(Method::GET, "/api/v1/notifications", Some(&owner), None)
        .await;
    assert_eq!(notifications["data"]["pagination"]["total"], 1);
    assert_eq!(notifications["data"]["items"][0]["kind"], "reservation.created");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_empty_range_and_abutting_reservations() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (status, body) = book(&ctx, &artist, &studio_id, "10:00", "10:00", json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_RANGE");

    let (status, _) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = book(&ctx, &artist, &studio_id, "12:00", "14:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_outside_opening_hours_rejected() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (status, body) = book(&ctx, &artist, &studio_id, "07:00", "10:00", json!([])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "STUDIO_UNAVAILABLE");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_equipment_hold_and_release() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (status, mic) = ctx
        .send(
            Method::POST,
            "/api/v1/equipment",
            Some(&owner),
            Some(json!({
                "studio_id": studio_id,
                "name": "U87",
                "equipment_type": "MICROPHONE",
                "hourly_rate_cents": 1000
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{mic}");
    let mic_id = mic["data"]["id"].as_str().unwrap().to_string();

    let lines = json!([{ "equipment_id": mic_id }]);

    let (status, first) = book(&ctx, &artist, &studio_id, "10:00", "12:00", lines.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["data"]["total_price_cents"], 12_000);
    assert_eq!(first["data"]["equipment_bookings"][0]["status"], "RESERVED");
    let first_id = first["data"]["id"].as_str().unwrap().to_string();

    // Cancelling releases both the studio and the microphone
    let (status, cancelled) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/bookings/{first_id}"),
            Some(&artist),
            Some(json!({ "status": "CANCELLED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");

    let (status, body) = book(&ctx, &artist, &studio_id, "10:00", "12:00", lines.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    // Equipment under maintenance cannot be booked
    let (status, _) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/equipment/{mic_id}"),
            Some(&owner),
            Some(json!({ "status": "MAINTENANCE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = book(&ctx, &artist, &studio_id, "14:00", "15:00", lines).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EQUIPMENT_CONFLICT");
    assert_eq!(body["details"]["equipment_id"], mic_id);

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_repeated_update_is_idempotent() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let uri = format!("/api/v1/bookings/{}", created["data"]["id"].as_str().unwrap());
    let update = json!({ "status": "CONFIRMED", "notes": "Bring the tapes" });

    let (status, once) = ctx.send(Method::PUT, &uri, Some(&owner), Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK, "{once}");

    let (status, twice) = ctx.send(Method::PUT, &uri, Some(&owner), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(once["data"], twice["data"]);
    assert_eq!(twice["data"]["status"], "CONFIRMED");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_author_cannot_confirm_own_reservation() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let uri = format!("/api/v1/bookings/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&artist), Some(json!({ "status": "CONFIRMED" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&owner), Some(json!({ "status": "COMPLETED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_payment_marks_confirmed_reservation_paid() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::PUT,
            &format!("/api/v1/bookings/{id}"),
            Some(&owner),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let payment_uri = format!("/api/v1/bookings/{id}/payment");
    let (status, paid) = ctx
        .send(
            Method::POST,
            &payment_uri,
            Some(&artist),
            Some(json!({ "status": "SUCCEEDED", "provider_reference": "pi_123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{paid}");
    assert_eq!(paid["data"]["reservation"]["status"], "PAID");
    assert_eq!(paid["data"]["payment"]["amount_cents"], 10_000);

    let (status, body) = ctx
        .send(Method::POST, &payment_uri, Some(&artist), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");

    let (status, details) = ctx
        .send(Method::GET, &format!("/api/v1/bookings/{id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["data"]["payment"]["provider_reference"], "pi_123");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_failed_payment_can_be_retried() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    confirm(&ctx, &owner, &id).await;

    let payment_uri = format!("/api/v1/bookings/{id}/payment");
    let (status, failed) = ctx
        .send(
            Method::POST,
            &payment_uri,
            Some(&artist),
            Some(json!({ "status": "FAILED", "provider_reference": "pi_declined" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{failed}");
    assert_eq!(failed["data"]["reservation"]["status"], "CONFIRMED");

    let (status, retried) = ctx
        .send(
            Method::POST,
            &payment_uri,
            Some(&artist),
            Some(json!({ "status": "SUCCEEDED", "provider_reference": "pi_retry" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{retried}");
    assert_eq!(retried["data"]["reservation"]["status"], "PAID");
    assert_eq!(retried["data"]["payment"]["status"], "SUCCEEDED");
    assert_eq!(retried["data"]["payment"]["provider_reference"], "pi_retry");
    assert_eq!(retried["data"]["payment"]["id"], failed["data"]["payment"]["id"]);

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_payment_status_moves_forward() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    confirm(&ctx, &owner, &id).await;

    let payment_uri = format!("/api/v1/bookings/{id}/payment");

    // Nothing to update yet
    let (status, body) = ctx
        .send(Method::PUT, &payment_uri, Some(&artist), Some(json!({ "status": "PROCESSING" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, pending) = ctx
        .send(Method::POST, &payment_uri, Some(&artist), Some(json!({ "status": "PENDING" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{pending}");
    assert_eq!(pending["data"]["reservation"]["status"], "CONFIRMED");

    // A pending payment is not replaced by a second attempt
    let (status, body) = ctx
        .send(Method::POST, &payment_uri, Some(&artist), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");

    let (status, processing) = ctx
        .send(
            Method::PUT,
            &payment_uri,
            Some(&artist),
            Some(json!({ "status": "PROCESSING", "provider_reference": "pi_456" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{processing}");
    assert_eq!(processing["data"]["payment"]["status"], "PROCESSING");
    assert_eq!(processing["data"]["reservation"]["status"], "CONFIRMED");

    let (status, body) = ctx
        .send(Method::PUT, &payment_uri, Some(&artist), Some(json!({ "status": "PENDING" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, succeeded) = ctx
        .send(Method::PUT, &payment_uri, Some(&artist), Some(json!({ "status": "SUCCEEDED" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{succeeded}");
    assert_eq!(succeeded["data"]["reservation"]["status"], "PAID");
    assert_eq!(succeeded["data"]["payment"]["provider_reference"], "pi_456");

    let (status, _) = ctx
        .send(Method::PUT, &payment_uri, Some(&artist), Some(json!({ "status": "FAILED" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_reschedule_moves_equipment_and_requotes() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;
    let mic_id = add_microphone(&ctx, &owner, &studio_id).await;

    let lines = json!([{ "equipment_id": mic_id }]);
    let (status, first) = book(&ctx, &artist, &studio_id, "10:00", "12:00", lines).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let first_uri = format!("/api/v1/bookings/{}", first["data"]["id"].as_str().unwrap());

    // 11:00-14:00 overlaps the reservation's own old slot
    let (status, moved) = ctx
        .send(
            Method::PUT,
            &first_uri,
            Some(&artist),
            Some(json!({ "start_time": at("11:00"), "end_time": at("14:00") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["data"]["total_price_cents"], 18_000);
    assert_eq!(timestamp(&moved["data"]["start_time"]), instant("11:00"));

    let (status, details) = ctx.send(Method::GET, &first_uri, Some(&artist), None).await;
    assert_eq!(status, StatusCode::OK);
    let held = &details["data"]["equipment_bookings"][0];
    assert_eq!(held["equipment_id"], mic_id);
    assert_eq!(timestamp(&held["start_time"]), instant("11:00"));
    assert_eq!(timestamp(&held["end_time"]), instant("14:00"));

    // The freed morning is open again
    let (status, body) = book(&ctx, &artist, &studio_id, "09:00", "11:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, second) = book(&ctx, &artist, &studio_id, "15:00", "16:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED, "{second}");

    let (status, body) = ctx
        .send(
            Method::PUT,
            &first_uri,
            Some(&artist),
            Some(json!({ "start_time": at("15:30"), "end_time": at("16:30") })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STUDIO_CONFLICT");
    assert_eq!(body["details"]["reservation_id"], second["data"]["id"]);

    // The failed move left the reservation where it was
    let (_, details) = ctx.send(Method::GET, &first_uri, Some(&artist), None).await;
    assert_eq!(timestamp(&details["data"]["end_time"]), instant("14:00"));
    assert_eq!(details["data"]["total_price_cents"], 18_000);

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_cancel_cannot_be_combined_with_move() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, first) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let (status, _) = book(&ctx, &artist, &studio_id, "14:00", "16:00", json!([])).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/bookings/{}", first["data"]["id"].as_str().unwrap());

    let (status, body) = ctx
        .send(
            Method::PUT,
            &uri,
            Some(&artist),
            Some(json!({
                "status": "CANCELLED",
                "start_time": at("14:00"),
                "end_time": at("16:00")
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, cancelled) = ctx
        .send(Method::PUT, &uri, Some(&artist), Some(json!({ "status": "CANCELLED" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["data"]["status"], "CANCELLED");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_overlong_reservation_rejected() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&artist),
            Some(json!({
                "studio_id": studio_id,
                "start_time": at("10:00"),
                "end_time": "2130-06-03T10:00:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    ctx.cleanup(&[&artist, &owner]).await;
}

#[tokio::test]
async fn test_reservations_hidden_from_strangers() {
    let Some(ctx) = TestContext::new().await else { return };
    let owner = ctx.create_user(UserRole::StudioOwner).await;
    let artist = ctx.create_user(UserRole::Artist).await;
    let stranger = ctx.create_user(UserRole::User).await;
    let studio_id = create_studio(&ctx, &owner).await;

    let (_, created) = book(&ctx, &artist, &studio_id, "10:00", "12:00", json!([])).await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, _) = ctx
        .send(Method::GET, &format!("/api/v1/bookings/{id}"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = ctx
        .send(Method::GET, "/api/v1/bookings", Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"]["pagination"]["total"], 0);

    let (_, listed) = ctx
        .send(Method::GET, "/api/v1/bookings", Some(&owner), None)
        .await;
    assert_eq!(listed["data"]["pagination"]["total"], 1);

    ctx.cleanup(&[&stranger, &artist, &owner]).await;
}

#[tokio::test]
async fn test_register_login_refresh_logout() {
    let Some(ctx) = TestContext::new().await else { return };
    let email = format!("Flow-{}@Example.com", uuid::Uuid::new_v4());

    let (status, registered) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": "SecureP@ss123",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "role": "ARTIST"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{registered}");
    assert_eq!(registered["data"]["user"]["email"], email.to_lowercase());
    assert!(registered["data"]["user"].get("password_hash").is_none());

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": email.to_uppercase(),
                "password": "SecureP@ss123",
                "first_name": "Ada",
                "last_name": "Lovelace"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");

    let (status, logged_in) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "SecureP@ss123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = logged_in["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = logged_in["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &ctx.app,
        Method::POST,
        "/api/auth/logout",
        Some(format!("Bearer {access}")),
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &ctx.app,
        Method::DELETE,
        "/api/auth/profile",
        Some(format!("Bearer {access}")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
