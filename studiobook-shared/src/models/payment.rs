/// Payment records
///
/// At most one payment per reservation (`payments.reservation_id` is
/// unique). Card processing is external; this table only records the
/// outcome reported by the provider. The row follows the provider:
/// `PENDING -> PROCESSING -> SUCCEEDED | FAILED`, and a `FAILED` row may be
/// replaced by a new attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// Provider-reported progress; `SUCCEEDED` and `FAILED` are final
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;

        matches!(
            (*self, next),
            (Pending, Processing | Succeeded | Failed) | (Processing, Succeeded | Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
}

const PAYMENT_COLUMNS: &str = "id, reservation_id, amount_cents, currency, status, \
     provider_reference, created_at, updated_at";

impl Payment {
    /// Records a payment
    ///
    /// # Errors
    ///
    /// A second payment for the same reservation fails with a unique
    /// violation on `payments_reservation_id_key`.
    pub async fn create(conn: &mut PgConnection, data: CreatePayment) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (reservation_id, amount_cents, currency, status, provider_reference)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(data.reservation_id)
            .bind(data.amount_cents)
            .bind(data.currency)
            .bind(data.status)
            .bind(data.provider_reference)
            .fetch_one(conn)
            .await
    }

    /// Locks the payment of a reservation, if one was recorded
    pub async fn lock_for_reservation(
        conn: &mut PgConnection,
        reservation_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reservation_id = $1 FOR UPDATE"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(reservation_id)
            .fetch_optional(conn)
            .await
    }

    /// Replaces a payment attempt in place, keeping its id
    pub async fn replace(
        conn: &mut PgConnection,
        id: Uuid,
        data: CreatePayment,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE payments
             SET amount_cents = $2, currency = $3, status = $4, provider_reference = $5,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(data.amount_cents)
            .bind(data.currency)
            .bind(data.status)
            .bind(data.provider_reference)
            .fetch_one(conn)
            .await
    }

    /// Sets the status; `None` keeps the stored provider reference
    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: PaymentStatus,
        provider_reference: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE payments
             SET status = $2, provider_reference = COALESCE($3, provider_reference),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(status)
            .bind(provider_reference)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_reservation(
        pool: &PgPool,
        reservation_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE reservation_id = $1");

        sqlx::query_as::<_, Payment>(&query)
            .bind(reservation_id)
            .fetch_optional(pool)
            .await
    }
}
