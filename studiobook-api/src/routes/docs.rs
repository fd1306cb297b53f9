/// `GET /api`: a static description of the available endpoints

use crate::{app::AppState, response::ApiResponse};
use axum::extract::State;
use serde_json::{json, Value};

pub async fn api_docs(State(state): State<AppState>) -> ApiResponse<Value> {
    let version = &state.config.api.version;

    ApiResponse::ok(json!({
        "name": "StudioBook API",
        "version": env!("CARGO_PKG_VERSION"),
        "base_paths": [format!("/api/{version}"), "/api"],
        "authentication": "Authorization: Bearer <access token>",
        "endpoints": {
            "health": {
                "GET /api/health": "Liveness",
                "GET /api/health/db": "Database connectivity and row counts"
            },
            "auth": {
                "POST /auth/register": "Create an account",
                "POST /auth/login": "Exchange credentials for tokens",
                "POST /auth/refresh": "Exchange a refresh token for a new access token",
                "GET /auth/profile": "Current user",
                "PUT /auth/profile": "Update names and phone",
                "DELETE /auth/profile": "Delete the account",
                "POST /auth/logout": "Revoke a refresh token"
            },
            "studios": {
                "GET /studios": "List studios (city, owner_id, min_capacity, max_hourly_rate_cents, is_active, page, limit)",
                "GET /studios/:id": "Studio with weekly availability and equipment",
                "POST /studios": "Create a studio",
                "PUT /studios/:id": "Update a studio",
                "DELETE /studios/:id": "Delete a studio"
            },
            "bookings": {
                "GET /bookings": "List visible reservations (studio_id, status, from, to, page, limit)",
                "GET /bookings/:id": "Reservation with equipment, participants and payment",
                "POST /bookings": "Request a reservation",
                "PUT /bookings/:id": "Reschedule, change status or notes",
                "POST /bookings/:id/payment": "Record the payment, replacing a failed one",
                "PUT /bookings/:id/payment": "Move the payment to PROCESSING, SUCCEEDED or FAILED"
            },
            "equipment": {
                "GET /equipment": "List equipment (studio_id, equipment_type, status, page, limit)",
                "GET /equipment/:id": "One item",
                "POST /equipment": "Add equipment to a studio",
                "PUT /equipment/:id": "Update equipment",
                "DELETE /equipment/:id": "Remove equipment"
            },
            "notifications": {
                "GET /notifications": "Own notifications (unread, page, limit)",
                "POST /notifications/:id/read": "Mark as read"
            }
        }
    }))
}
