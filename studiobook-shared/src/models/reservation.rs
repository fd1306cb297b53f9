/// Reservation model and database operations
///
/// A reservation holds a studio for the half-open interval
/// `[start_time, end_time)`. Inserts and reschedules go through
/// [`crate::booking`], which runs the conflict checks under row locks; this
/// module only knows how to read and write rows.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE reservation_status AS ENUM ('PENDING', 'CONFIRMED', 'PAID', 'CANCELLED', 'COMPLETED');
///
/// CREATE TABLE reservations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     studio_id UUID NOT NULL REFERENCES studios(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ NOT NULL,
///     status reservation_status NOT NULL DEFAULT 'PENDING',
///     total_price_cents BIGINT NOT NULL DEFAULT 0,
///     currency CHAR(3) NOT NULL DEFAULT 'EUR',
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (end_time > start_time)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Reservation lifecycle
///
/// ```text
/// PENDING ──► CONFIRMED ──► PAID ──► COMPLETED
///    │            │           │
///    └────────────┴───────────┴────► CANCELLED
///                 └────────────────► COMPLETED
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Paid,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Paid => "PAID",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    /// Whether a reservation in this status keeps the studio booked
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed | ReservationStatus::Paid
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::Completed)
    }

    /// Whether the times of a reservation in this status may still move
    pub fn is_reschedulable(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    /// Checks a status change; staying in the same status is always allowed
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Paid)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
                | (Paid, Completed)
                | (Paid, Cancelled)
        )
    }

    /// Statuses only the studio owner or an admin may set
    pub fn requires_studio_manager(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Confirmed | ReservationStatus::Paid | ReservationStatus::Completed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub studio_id: Uuid,

    /// Author of the reservation
    pub user_id: Uuid,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub total_price_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row values for a new reservation, produced by the admission check
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub studio_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price_cents: i64,
    pub currency: String,
    pub notes: Option<String>,
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub studio_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,

    /// Only reservations ending after this instant
    pub from: Option<DateTime<Utc>>,

    /// Only reservations starting before this instant
    pub to: Option<DateTime<Utc>>,

    /// Restricts results to reservations the user authored, participates
    /// in, or whose studio they own. `None` means unrestricted (admins).
    pub visible_to: Option<Uuid>,
}

const RESERVATION_COLUMNS: &str = "r.id, r.studio_id, r.user_id, r.start_time, r.end_time, \
     r.status, r.total_price_cents, r.currency, r.notes, r.created_at, r.updated_at";

impl ReservationFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");

        if let Some(studio_id) = self.studio_id {
            builder.push(" AND r.studio_id = ").push_bind(studio_id);
        }
        if let Some(status) = self.status {
            builder.push(" AND r.status = ").push_bind(status);
        }
        if let Some(from) = self.from {
            builder.push(" AND r.end_time > ").push_bind(from);
        }
        if let Some(to) = self.to {
            builder.push(" AND r.start_time < ").push_bind(to);
        }
        if let Some(user_id) = self.visible_to {
            builder
                .push(" AND (r.user_id = ")
                .push_bind(user_id)
                .push(" OR s.owner_id = ")
                .push_bind(user_id)
                .push(" OR EXISTS (SELECT 1 FROM reservation_participants p WHERE p.reservation_id = r.id AND p.user_id = ")
                .push_bind(user_id)
                .push("))");
        }
    }
}

impl Reservation {
    pub async fn insert(
        conn: &mut PgConnection,
        data: NewReservation,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO reservations AS r (studio_id, user_id, start_time, end_time,
                                            total_price_cents, currency, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {RESERVATION_COLUMNS}"
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(data.studio_id)
            .bind(data.user_id)
            .bind(data.start_time)
            .bind(data.end_time)
            .bind(data.total_price_cents)
            .bind(data.currency)
            .bind(data.notes)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = $1");

        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Reads a reservation and locks its row for the transaction
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = $1 FOR UPDATE"
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// First blocking reservation of the studio overlapping `[start, end)`
    ///
    /// `exclude` skips one reservation, used when rescheduling it.
    pub async fn find_blocking_overlap(
        conn: &mut PgConnection,
        studio_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r
             WHERE r.studio_id = $1
               AND r.status IN ('PENDING', 'CONFIRMED', 'PAID')
               AND r.start_time < $3
               AND r.end_time > $2
               AND ($4::uuid IS NULL OR r.id <> $4)
             ORDER BY r.start_time
             LIMIT 1"
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(studio_id)
            .bind(start)
            .bind(end)
            .bind(exclude)
            .fetch_optional(conn)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &ReservationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r JOIN studios s ON s.id = r.studio_id"
        ));
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY r.start_time DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        builder.build_query_as::<Reservation>().fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool, filter: &ReservationFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM reservations r JOIN studios s ON s.id = r.studio_id",
        );
        filter.push_conditions(&mut builder);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Moves the reservation and stores its re-quoted price
    pub async fn reschedule(
        conn: &mut PgConnection,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        total_price_cents: i64,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE reservations r
             SET start_time = $2, end_time = $3, total_price_cents = $4, updated_at = NOW()
             WHERE r.id = $1
             RETURNING {RESERVATION_COLUMNS}"
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(start)
            .bind(end)
            .bind(total_price_cents)
            .fetch_one(conn)
            .await
    }

    /// Sets status and/or notes; `None` keeps the stored value
    pub async fn update_details(
        conn: &mut PgConnection,
        id: Uuid,
        status: Option<ReservationStatus>,
        notes: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE reservations r
             SET status = COALESCE($2, status), notes = COALESCE($3, notes), updated_at = NOW()
             WHERE r.id = $1
             RETURNING {RESERVATION_COLUMNS}"
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(status)
            .bind(notes)
            .fetch_one(conn)
            .await
    }

    pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
            .fetch_one(pool)
            .await
    }
}
