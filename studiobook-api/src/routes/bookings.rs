/// Reservation endpoints
///
/// All routes require a bearer token.
///
/// # Endpoints
///
/// - `GET /bookings` - Reservations visible to the caller
/// - `GET /bookings/:id` - Reservation with equipment, participants and payment
/// - `POST /bookings` - Request a reservation (admission check)
/// - `PUT /bookings/:id` - Reschedule, change status or edit notes
/// - `POST /bookings/:id/payment` - Record the payment
///
/// Conflicts come back as `409` with the conflicting id in `details`:
///
/// ```json
/// {
///   "success": false,
///   "error": "Studio is already booked for an overlapping period",
///   "code": "STUDIO_CONFLICT",
///   "details": { "reservation_id": "uuid" }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{ApiResponse, Created, PageQuery, Paginated},
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studiobook_shared::{
    auth::{
        authorization::{require_reservation_edit, require_reservation_view, ReservationAccess},
        middleware::AuthContext,
    },
    booking::{
        admission::{EquipmentRequest, ParticipantRequest, ReservationRequest},
        admit_reservation,
        lifecycle::{Actor, PaymentRecord, ReservationUpdate},
        record_payment, update_payment, update_reservation,
    },
    models::{
        equipment_booking::EquipmentBooking,
        participant::ReservationParticipant,
        payment::{Payment, PaymentStatus},
        reservation::{Reservation, ReservationFilter, ReservationStatus},
        studio::Studio,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Reservation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub studio_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    #[serde(default)]
    pub equipment: Vec<EquipmentRequest>,

    #[serde(default)]
    pub participants: Vec<ParticipantRequest>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Reservation changes; omitted fields are kept
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Payment outcome reported by the client
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentRequest {
    /// Defaults to `SUCCEEDED`
    #[serde(default = "default_payment_status")]
    pub status: PaymentStatus,

    #[validate(length(min = 1, max = 255, message = "Provider reference must be 1 to 255 characters"))]
    pub provider_reference: Option<String>,
}

/// Payment status update; the status is required here
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    pub status: PaymentStatus,

    #[validate(length(min = 1, max = 255, message = "Provider reference must be 1 to 255 characters"))]
    pub provider_reference: Option<String>,
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Succeeded
}

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub studio_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Reservation with everything attached to it
#[derive(Debug, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub equipment_bookings: Vec<EquipmentBooking>,
    pub participants: Vec<ReservationParticipant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub reservation: Reservation,
}

/// Loads a reservation and the facts deciding who may see or change it
async fn load_with_access(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Reservation, ReservationAccess)> {
    let reservation = Reservation::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reservation not found".to_string()))?;

    let studio = Studio::find_by_id(&state.db, reservation.studio_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))?;

    let caller_is_participant =
        ReservationParticipant::is_participant(&state.db, id, auth.user_id).await?;

    let access = ReservationAccess {
        author_id: reservation.user_id,
        studio_owner_id: studio.owner_id,
        caller_is_participant,
    };

    Ok((reservation, access))
}

/// List reservations
///
/// Admins see every reservation. Everyone else sees the ones they
/// authored, participate in, or whose studio they own.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/bookings?status=PENDING&from=2025-06-01T00:00:00Z&page=1
/// Authorization: Bearer <access token>
/// ```
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> ApiResult<ApiResponse<Paginated<Reservation>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let filter = ReservationFilter {
        studio_id: query.studio_id,
        status: query.status,
        from: query.from,
        to: query.to,
        visible_to: (!auth.is_admin()).then_some(auth.user_id),
    };

    let reservations = Reservation::list(&state.db, &filter, page.limit(), page.offset()).await?;
    let total = Reservation::count(&state.db, &filter).await?;

    Ok(ApiResponse::ok(Paginated::new(reservations, page, total)))
}

/// Get one reservation with its equipment bookings, participants and payment
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the author, a participant, the studio owner or an admin
/// - `404 Not Found`: No such reservation
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<BookingDetails>> {
    let (reservation, access) = load_with_access(&state, &auth, id).await?;
    require_reservation_view(&auth, &access)?;

    let equipment_bookings = EquipmentBooking::list_for_reservation(&state.db, id).await?;
    let participants = ReservationParticipant::list_for_reservation(&state.db, id).await?;
    let payment = Payment::find_by_reservation(&state.db, id).await?;

    Ok(ApiResponse::ok(BookingDetails {
        reservation,
        equipment_bookings,
        participants,
        payment,
    }))
}

/// Request a reservation
///
/// Runs the admission check: the range must be non-empty, the studio
/// active and open for the whole interval, and neither the studio nor any
/// requested equipment may be held by an overlapping reservation.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/bookings
/// Authorization: Bearer <access token>
///
/// {
///   "studio_id": "uuid",
///   "start_time": "2025-06-02T10:00:00Z",
///   "end_time": "2025-06-02T12:00:00Z",
///   "equipment": [ { "equipment_id": "uuid", "quantity": 1 } ],
///   "participants": [ { "user_id": "uuid", "role": "ENGINEER" } ],
///   "notes": "Vocal session"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the `PENDING` reservation and its attachments.
///
/// # Errors
///
/// - `400 Bad Request`: `INVALID_RANGE` or `VALIDATION_ERROR`
/// - `404 Not Found`: Studio or equipment missing
/// - `409 Conflict`: `STUDIO_CONFLICT` or `EQUIPMENT_CONFLICT`
/// - `422 Unprocessable Entity`: `STUDIO_UNAVAILABLE`
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> ApiResult<Created<BookingDetails>> {
    let admitted = admit_reservation(
        &state.db,
        ReservationRequest {
            studio_id: req.studio_id,
            user_id: auth.user_id,
            start: req.start_time,
            end: req.end_time,
            equipment: req.equipment,
            participants: req.participants,
            notes: req.notes,
        },
    )
    .await?;

    Ok(Created(ApiResponse::with_message(
        BookingDetails {
            reservation: admitted.reservation,
            equipment_bookings: admitted.equipment_bookings,
            participants: admitted.participants,
            payment: None,
        },
        "Reservation created",
    )))
}

/// Update a reservation
///
/// The author may reschedule, cancel and edit notes. Confirming, marking
/// paid and completing are reserved to the studio owner and admins.
/// Repeating an update leaves the row unchanged.
///
/// # Endpoint
///
/// ```text
/// PUT /api/v1/bookings/:id
/// Authorization: Bearer <access token>
///
/// { "status": "CONFIRMED" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid range or status transition
/// - `403 Forbidden`: Caller may not change this reservation or set this status
/// - `409 Conflict`: The new interval collides with another hold
/// - `422 Unprocessable Entity`: The studio is closed during the new interval
pub async fn update_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBookingRequest>,
) -> ApiResult<ApiResponse<Reservation>> {
    let (_, access) = load_with_access(&state, &auth, id).await?;
    require_reservation_edit(&auth, &access)?;

    let actor = Actor {
        user_id: auth.user_id,
        can_manage: access.can_manage(&auth),
    };

    let reservation = update_reservation(
        &state.db,
        id,
        ReservationUpdate {
            start: req.start_time,
            end: req.end_time,
            status: req.status,
            notes: req.notes,
        },
        actor,
    )
    .await?;

    Ok(ApiResponse::with_message(reservation, "Reservation updated"))
}

/// Record the payment of a reservation
///
/// Amount and currency are taken from the reservation. A `SUCCEEDED`
/// payment moves a `CONFIRMED` reservation to `PAID`. A `FAILED` payment is
/// replaced by the new attempt.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/bookings/:id/payment
/// Authorization: Bearer <access token>
///
/// { "status": "SUCCEEDED", "provider_reference": "pi_123" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: The reservation is cancelled
/// - `403 Forbidden`: Caller is not the author, the studio owner or an admin
/// - `409 Conflict`: A payment that has not failed was already recorded
pub async fn record_booking_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<PaymentRequest>,
) -> ApiResult<Created<PaymentResponse>> {
    let (_, access) = load_with_access(&state, &auth, id).await?;
    require_reservation_edit(&auth, &access)?;

    let (payment, reservation) = record_payment(
        &state.db,
        id,
        PaymentRecord {
            status: req.status,
            provider_reference: req.provider_reference,
        },
    )
    .await?;

    Ok(Created(ApiResponse::with_message(
        PaymentResponse {
            payment,
            reservation,
        },
        "Payment recorded",
    )))
}

/// Move the recorded payment to a new status
///
/// `PENDING -> PROCESSING -> SUCCEEDED | FAILED`. Reaching `SUCCEEDED`
/// moves a `CONFIRMED` reservation to `PAID`.
///
/// # Endpoint
///
/// ```text
/// PUT /api/v1/bookings/:id/payment
/// Authorization: Bearer <access token>
///
/// { "status": "PROCESSING", "provider_reference": "pi_123" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: No payment recorded, or the status cannot follow
///   the current one
/// - `403 Forbidden`: Caller is not the author, the studio owner or an admin
pub async fn update_booking_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentRequest>,
) -> ApiResult<ApiResponse<PaymentResponse>> {
    let (_, access) = load_with_access(&state, &auth, id).await?;
    require_reservation_edit(&auth, &access)?;

    let (payment, reservation) = update_payment(
        &state.db,
        id,
        PaymentRecord {
            status: req.status,
            provider_reference: req.provider_reference,
        },
    )
    .await?;

    Ok(ApiResponse::with_message(
        PaymentResponse {
            payment,
            reservation,
        },
        "Payment updated",
    ))
}
