/// Reservation admission check
///
/// Decides whether a studio (and optionally some of its equipment) can be
/// held for `[start, end)` and, if so, writes the reservation. Everything
/// happens in one transaction that first locks the studio row and then the
/// requested equipment rows in id order. Concurrent requests for the same
/// studio are serialized on that lock, so the overlap queries always see
/// every reservation committed before them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use super::pricing::{quote_price, EquipmentRate};
use super::schedule::{
    covers_interval, validate_range, within_max_duration, MAX_RESERVATION_DAYS,
};
use crate::models::availability::{Availability, AvailabilityWindow};
use crate::models::equipment::Equipment;
use crate::models::equipment_booking::EquipmentBooking;
use crate::models::notification::{CreateNotification, Notification, KIND_RESERVATION_CREATED};
use crate::models::participant::{ParticipantRole, ReservationParticipant};
use crate::models::reservation::{NewReservation, Reservation};
use crate::models::studio::Studio;

/// Why a reservation was refused
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("end_time must be after start_time")]
    InvalidRange,

    #[error("{0}")]
    Validation(String),

    #[error("Studio not found")]
    StudioNotFound,

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Equipment {0} not found in this studio")]
    EquipmentNotFound(Uuid),

    #[error("Studio is not open for the requested time")]
    StudioUnavailable,

    #[error("Studio is already booked for an overlapping time")]
    StudioConflict { reservation_id: Uuid },

    #[error("Equipment is not available for the requested time")]
    EquipmentConflict { equipment_id: Uuid },

    #[error("Cannot change reservation from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One piece of equipment asked for with a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EquipmentRequest {
    pub equipment_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// A user invited to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ParticipantRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: ParticipantRole,
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub studio_id: Uuid,

    /// Author of the reservation
    pub user_id: Uuid,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub equipment: Vec<EquipmentRequest>,
    pub participants: Vec<ParticipantRequest>,
    pub notes: Option<String>,
}

/// Rows written for an admitted reservation
#[derive(Debug, Clone)]
pub struct AdmittedReservation {
    pub reservation: Reservation,
    pub equipment_bookings: Vec<EquipmentBooking>,
    pub participants: Vec<ReservationParticipant>,
}

/// Rejects repeated equipment ids and non-positive quantities
pub fn validate_equipment_lines(lines: &[EquipmentRequest]) -> Result<(), AdmissionError> {
    let mut seen = HashSet::with_capacity(lines.len());

    for line in lines {
        if line.quantity < 1 {
            return Err(AdmissionError::Validation(format!(
                "quantity for equipment {} must be at least 1",
                line.equipment_id
            )));
        }
        if !seen.insert(line.equipment_id) {
            return Err(AdmissionError::Validation(format!(
                "equipment {} requested more than once",
                line.equipment_id
            )));
        }
    }

    Ok(())
}

/// Runs the admission check and writes the reservation
///
/// # Errors
///
/// - [`AdmissionError::InvalidRange`] when `end <= start`
/// - [`AdmissionError::StudioNotFound`] for a missing or inactive studio
/// - [`AdmissionError::StudioUnavailable`] outside opening hours
/// - [`AdmissionError::StudioConflict`] on an overlapping blocking reservation
/// - [`AdmissionError::EquipmentNotFound`] for equipment of another studio
/// - [`AdmissionError::EquipmentConflict`] for unusable or double-booked equipment
pub async fn admit_reservation(
    pool: &PgPool,
    request: ReservationRequest,
) -> Result<AdmittedReservation, AdmissionError> {
    check_range(request.start, request.end)?;
    validate_equipment_lines(&request.equipment)?;

    let mut tx = pool.begin().await?;

    let studio = match Studio::lock_for_update(&mut *tx, request.studio_id).await? {
        Some(studio) if studio.is_active => studio,
        _ => return Err(AdmissionError::StudioNotFound),
    };

    let lines: Vec<(Uuid, i32)> = request
        .equipment
        .iter()
        .map(|line| (line.equipment_id, line.quantity))
        .collect();

    let rates = check_slot(&mut *tx, &studio, request.start, request.end, &lines, None).await?;
    let total_price_cents =
        quote_price(studio.hourly_rate_cents, &rates, request.start, request.end);

    let reservation = Reservation::insert(
        &mut *tx,
        NewReservation {
            studio_id: studio.id,
            user_id: request.user_id,
            start_time: request.start,
            end_time: request.end,
            total_price_cents,
            currency: studio.currency.clone(),
            notes: request.notes,
        },
    )
    .await?;

    let mut equipment_bookings = Vec::with_capacity(lines.len());
    for (equipment_id, quantity) in &lines {
        let booking = EquipmentBooking::insert(
            &mut *tx,
            reservation.id,
            *equipment_id,
            reservation.start_time,
            reservation.end_time,
            *quantity,
        )
        .await?;
        equipment_bookings.push(booking);
    }

    let mut participants = Vec::with_capacity(request.participants.len());
    for participant in &request.participants {
        if let Some(row) = ReservationParticipant::insert(
            &mut *tx,
            reservation.id,
            participant.user_id,
            participant.role,
        )
        .await?
        {
            participants.push(row);
        }
    }

    if studio.owner_id != request.user_id {
        Notification::create(
            &mut *tx,
            CreateNotification {
                user_id: studio.owner_id,
                kind: KIND_RESERVATION_CREATED,
                title: format!("New reservation for {}", studio.name),
                body: format!(
                    "Requested from {} to {}",
                    reservation.start_time.to_rfc3339(),
                    reservation.end_time.to_rfc3339()
                ),
                data: serde_json::json!({
                    "reservation_id": reservation.id,
                    "studio_id": studio.id,
                }),
            },
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        studio_id = %studio.id,
        user_id = %request.user_id,
        total_price_cents,
        "Reservation admitted"
    );

    Ok(AdmittedReservation {
        reservation,
        equipment_bookings,
        participants,
    })
}

/// Interval checks that need no store access
pub(crate) fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AdmissionError> {
    if !validate_range(start, end) {
        return Err(AdmissionError::InvalidRange);
    }
    if !within_max_duration(start, end) {
        return Err(AdmissionError::Validation(format!(
            "A reservation cannot be longer than {MAX_RESERVATION_DAYS} days"
        )));
    }
    Ok(())
}

/// Availability and conflict checks shared by admission and rescheduling
///
/// Expects the studio row to be locked already. Locks the equipment rows,
/// then returns their rates in request order for pricing. `exclude` is the
/// reservation being moved, if any.
pub(crate) async fn check_slot(
    conn: &mut PgConnection,
    studio: &Studio,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lines: &[(Uuid, i32)],
    exclude: Option<Uuid>,
) -> Result<Vec<EquipmentRate>, AdmissionError> {
    let windows: Vec<AvailabilityWindow> = Availability::list_for_studio_in(&mut *conn, studio.id)
        .await?
        .iter()
        .map(AvailabilityWindow::from)
        .collect();

    if !covers_interval(&windows, start, end) {
        tracing::debug!(studio_id = %studio.id, %start, %end, "Outside opening hours");
        return Err(AdmissionError::StudioUnavailable);
    }

    if let Some(existing) =
        Reservation::find_blocking_overlap(&mut *conn, studio.id, start, end, exclude).await?
    {
        tracing::debug!(
            studio_id = %studio.id,
            conflicting_id = %existing.id,
            "Studio already booked"
        );
        return Err(AdmissionError::StudioConflict {
            reservation_id: existing.id,
        });
    }

    let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
    let locked = Equipment::lock_many(&mut *conn, &ids).await?;

    let mut rates = Vec::with_capacity(lines.len());
    for (equipment_id, quantity) in lines {
        let item = locked
            .iter()
            .find(|item| item.id == *equipment_id && item.studio_id == studio.id)
            .ok_or(AdmissionError::EquipmentNotFound(*equipment_id))?;

        if !item.status.is_bookable() {
            return Err(AdmissionError::EquipmentConflict {
                equipment_id: item.id,
            });
        }

        if EquipmentBooking::find_active_overlap(&mut *conn, item.id, start, end, exclude)
            .await?
            .is_some()
        {
            return Err(AdmissionError::EquipmentConflict {
                equipment_id: item.id,
            });
        }

        rates.push(EquipmentRate {
            hourly_rate_cents: item.hourly_rate_cents,
            daily_rate_cents: item.daily_rate_cents,
            quantity: *quantity,
        });
    }

    Ok(rates)
}
