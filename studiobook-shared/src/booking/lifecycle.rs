/// Changes to an existing reservation: rescheduling, status and payment
///
/// Locks are taken in the same order as admission (studio, then the
/// reservation, then equipment) so updates and new bookings of one studio
/// queue behind each other instead of deadlocking.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::admission::{check_range, check_slot, AdmissionError};
use super::pricing::quote_price;
use crate::models::equipment_booking::EquipmentBooking;
use crate::models::notification::{
    CreateNotification, Notification, KIND_PAYMENT_RECEIVED, KIND_RESERVATION_UPDATED,
};
use crate::models::payment::{CreatePayment, Payment, PaymentStatus};
use crate::models::reservation::{Reservation, ReservationStatus};
use crate::models::studio::Studio;

/// Who is changing the reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,

    /// Studio owner or admin
    pub can_manage: bool,
}

/// Requested changes; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct ReservationUpdate {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
    pub notes: Option<String>,
}

/// Checks a status change against the lifecycle and the actor's rights
pub fn check_transition(
    current: ReservationStatus,
    next: ReservationStatus,
    actor: Actor,
) -> Result<(), AdmissionError> {
    if current == next {
        return Ok(());
    }
    if !current.can_transition_to(next) {
        return Err(AdmissionError::InvalidTransition {
            from: current.as_str(),
            to: next.as_str(),
        });
    }
    if next.requires_studio_manager() && !actor.can_manage {
        return Err(AdmissionError::Forbidden(format!(
            "Only the studio owner can set a reservation to {}",
            next.as_str()
        )));
    }
    Ok(())
}

/// Applies a reschedule, status change and/or notes edit atomically
///
/// Sending back the stored values changes nothing, so repeating an update
/// is harmless. New times cannot be combined with a move to a status that
/// frees the slot (`CANCELLED`, `COMPLETED`).
pub async fn update_reservation(
    pool: &PgPool,
    reservation_id: Uuid,
    update: ReservationUpdate,
    actor: Actor,
) -> Result<Reservation, AdmissionError> {
    let (studio, mut reservation, mut tx) = lock_reservation(pool, reservation_id).await?;

    let start = update.start.unwrap_or(reservation.start_time);
    let end = update.end.unwrap_or(reservation.end_time);
    let moved = start != reservation.start_time || end != reservation.end_time;

    if let Some(next) = update.status {
        check_transition(reservation.status, next, actor)?;
    }

    if moved {
        check_range(start, end)?;
        if let Some(next) = update.status.filter(|next| !next.is_blocking()) {
            return Err(AdmissionError::Validation(format!(
                "A reservation cannot be rescheduled and set to {} at once",
                next.as_str()
            )));
        }
        if !reservation.status.is_reschedulable() {
            return Err(AdmissionError::Validation(format!(
                "A {} reservation cannot be rescheduled",
                reservation.status.as_str()
            )));
        }

        reservation = reschedule(&mut *tx, &studio, &reservation, start, end).await?;
    }

    let status_change = update.status.filter(|next| *next != reservation.status);
    let notes_change = update
        .notes
        .filter(|notes| reservation.notes.as_deref() != Some(notes.as_str()));

    if status_change.is_some() || notes_change.is_some() {
        reservation =
            Reservation::update_details(&mut *tx, reservation.id, status_change, notes_change)
                .await?;
    }

    if let Some(next) = status_change {
        if !next.is_blocking() {
            EquipmentBooking::release_for_reservation(&mut *tx, reservation.id).await?;
        }
        notify_status_change(&mut *tx, &studio, &reservation, actor).await?;

        tracing::info!(
            reservation_id = %reservation.id,
            status = next.as_str(),
            actor_id = %actor.user_id,
            "Reservation status changed"
        );
    }

    tx.commit().await?;

    Ok(reservation)
}

/// Opens a transaction holding the studio lock, then the reservation lock
async fn lock_reservation(
    pool: &PgPool,
    reservation_id: Uuid,
) -> Result<(Studio, Reservation, Transaction<'static, Postgres>), AdmissionError> {
    let studio_id = Reservation::find_by_id(pool, reservation_id)
        .await?
        .ok_or(AdmissionError::ReservationNotFound)?
        .studio_id;

    let mut tx = pool.begin().await?;

    let studio = Studio::lock_for_update(&mut *tx, studio_id)
        .await?
        .ok_or(AdmissionError::StudioNotFound)?;
    let reservation = Reservation::lock_for_update(&mut *tx, reservation_id)
        .await?
        .ok_or(AdmissionError::ReservationNotFound)?;

    Ok((studio, reservation, tx))
}

async fn reschedule(
    conn: &mut PgConnection,
    studio: &Studio,
    reservation: &Reservation,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Reservation, AdmissionError> {
    let lines = EquipmentBooking::active_lines(&mut *conn, reservation.id).await?;
    let rates = check_slot(&mut *conn, studio, start, end, &lines, Some(reservation.id)).await?;
    let total_price_cents = quote_price(studio.hourly_rate_cents, &rates, start, end);

    EquipmentBooking::reschedule_for_reservation(&mut *conn, reservation.id, start, end).await?;
    let moved = Reservation::reschedule(&mut *conn, reservation.id, start, end, total_price_cents)
        .await?;

    tracing::info!(
        reservation_id = %moved.id,
        %start,
        %end,
        total_price_cents,
        "Reservation rescheduled"
    );

    Ok(moved)
}

/// Tells the other side of the reservation about a status change
async fn notify_status_change(
    conn: &mut PgConnection,
    studio: &Studio,
    reservation: &Reservation,
    actor: Actor,
) -> Result<(), AdmissionError> {
    let recipient = if actor.user_id == reservation.user_id {
        studio.owner_id
    } else {
        reservation.user_id
    };
    if recipient == actor.user_id {
        return Ok(());
    }

    Notification::create(
        conn,
        CreateNotification {
            user_id: recipient,
            kind: KIND_RESERVATION_UPDATED,
            title: format!("Reservation {}", reservation.status.as_str().to_lowercase()),
            body: format!(
                "The reservation at {} is now {}",
                studio.name,
                reservation.status.as_str()
            ),
            data: serde_json::json!({
                "reservation_id": reservation.id,
                "status": reservation.status,
            }),
        },
    )
    .await?;

    Ok(())
}

/// Payment outcome reported for a reservation
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
}

/// Records the payment of a reservation
///
/// The amount and currency always come from the reservation. A `FAILED`
/// payment is replaced by the new attempt; any other recorded payment must
/// be moved on with [`update_payment`].
///
/// # Errors
///
/// [`AdmissionError::Duplicate`] when a payment that has not failed is
/// already recorded.
pub async fn record_payment(
    pool: &PgPool,
    reservation_id: Uuid,
    record: PaymentRecord,
) -> Result<(Payment, Reservation), AdmissionError> {
    let (studio, reservation, mut tx) = lock_reservation(pool, reservation_id).await?;

    if reservation.status == ReservationStatus::Cancelled {
        return Err(AdmissionError::Validation(
            "A cancelled reservation cannot be paid".to_string(),
        ));
    }

    let data = CreatePayment {
        reservation_id: reservation.id,
        amount_cents: reservation.total_price_cents,
        currency: reservation.currency.clone(),
        status: record.status,
        provider_reference: record.provider_reference,
    };

    let payment = match Payment::lock_for_reservation(&mut *tx, reservation.id).await? {
        None => Payment::create(&mut *tx, data).await?,
        Some(failed) if failed.status == PaymentStatus::Failed => {
            tracing::debug!(payment_id = %failed.id, "Replacing failed payment");
            Payment::replace(&mut *tx, failed.id, data).await?
        }
        Some(existing) => {
            return Err(AdmissionError::Duplicate(format!(
                "A {} payment was already recorded for this reservation",
                existing.status.as_str()
            )));
        }
    };

    let reservation = settle(&mut *tx, &studio, reservation, &payment).await?;

    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        payment_id = %payment.id,
        amount_cents = payment.amount_cents,
        status = payment.status.as_str(),
        "Payment recorded"
    );

    Ok((payment, reservation))
}

/// Moves the recorded payment of a reservation to a new status
///
/// Repeating the current status only refreshes the provider reference.
///
/// # Errors
///
/// [`AdmissionError::Validation`] when no payment is recorded or the
/// payment cannot move from its status to the requested one.
pub async fn update_payment(
    pool: &PgPool,
    reservation_id: Uuid,
    record: PaymentRecord,
) -> Result<(Payment, Reservation), AdmissionError> {
    let (studio, reservation, mut tx) = lock_reservation(pool, reservation_id).await?;

    let current = Payment::lock_for_reservation(&mut *tx, reservation.id)
        .await?
        .ok_or_else(|| {
            AdmissionError::Validation("No payment recorded for this reservation".to_string())
        })?;

    if current.status != record.status && !current.status.can_transition_to(record.status) {
        return Err(AdmissionError::Validation(format!(
            "Cannot change payment from {} to {}",
            current.status.as_str(),
            record.status.as_str()
        )));
    }
    if record.status == PaymentStatus::Succeeded
        && reservation.status == ReservationStatus::Cancelled
    {
        return Err(AdmissionError::Validation(
            "A cancelled reservation cannot be paid".to_string(),
        ));
    }

    let payment =
        Payment::update_status(&mut *tx, current.id, record.status, record.provider_reference)
            .await?;

    let reservation = if payment.status != current.status {
        settle(&mut *tx, &studio, reservation, &payment).await?
    } else {
        reservation
    };

    tx.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        payment_id = %payment.id,
        from = current.status.as_str(),
        to = payment.status.as_str(),
        "Payment updated"
    );

    Ok((payment, reservation))
}

/// Marks a confirmed reservation paid once its payment succeeded, and tells
/// the studio owner about the payment
async fn settle(
    conn: &mut PgConnection,
    studio: &Studio,
    mut reservation: Reservation,
    payment: &Payment,
) -> Result<Reservation, AdmissionError> {
    if payment.status == PaymentStatus::Succeeded
        && reservation.status == ReservationStatus::Confirmed
    {
        reservation = Reservation::update_details(
            &mut *conn,
            reservation.id,
            Some(ReservationStatus::Paid),
            None,
        )
        .await?;
    }

    if studio.owner_id != reservation.user_id {
        Notification::create(
            conn,
            CreateNotification {
                user_id: studio.owner_id,
                kind: KIND_PAYMENT_RECEIVED,
                title: "Payment recorded".to_string(),
                body: format!(
                    "Payment of {} {} is {}",
                    payment.amount_cents,
                    payment.currency,
                    payment.status.as_str()
                ),
                data: serde_json::json!({
                    "reservation_id": reservation.id,
                    "payment_id": payment.id,
                }),
            },
        )
        .await?;
    }

    Ok(reservation)
}
