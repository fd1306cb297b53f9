/// Equipment attached to a reservation
///
/// A booking copies the reservation's interval. While it is `RESERVED` or
/// `IN_USE` it blocks the item for that interval; once `RETURNED` it no
/// longer counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "equipment_booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentBookingStatus {
    #[default]
    Reserved,
    InUse,
    Returned,
}

impl EquipmentBookingStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, EquipmentBookingStatus::Returned)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EquipmentBooking {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub equipment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub quantity: i32,
    pub status: EquipmentBookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BOOKING_COLUMNS: &str = "id, reservation_id, equipment_id, start_time, end_time, quantity, \
     status, created_at, updated_at";

impl EquipmentBooking {
    pub async fn insert(
        conn: &mut PgConnection,
        reservation_id: Uuid,
        equipment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        quantity: i32,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO equipment_bookings (reservation_id, equipment_id, start_time, end_time, quantity)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {BOOKING_COLUMNS}"
        );

        sqlx::query_as::<_, EquipmentBooking>(&query)
            .bind(reservation_id)
            .bind(equipment_id)
            .bind(start)
            .bind(end)
            .bind(quantity)
            .fetch_one(conn)
            .await
    }

    pub async fn list_for_reservation(
        pool: &PgPool,
        reservation_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM equipment_bookings
             WHERE reservation_id = $1 ORDER BY created_at"
        );

        sqlx::query_as::<_, EquipmentBooking>(&query)
            .bind(reservation_id)
            .fetch_all(pool)
            .await
    }

    /// `(equipment_id, quantity)` of the bookings still held by a reservation
    pub async fn active_lines(
        conn: &mut PgConnection,
        reservation_id: Uuid,
    ) -> Result<Vec<(Uuid, i32)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT equipment_id, quantity FROM equipment_bookings
             WHERE reservation_id = $1 AND status IN ('RESERVED', 'IN_USE')
             ORDER BY equipment_id",
        )
        .bind(reservation_id)
        .fetch_all(conn)
        .await
    }

    /// First active booking of the item overlapping `[start, end)`
    ///
    /// `exclude_reservation` skips bookings of the reservation being moved.
    pub async fn find_active_overlap(
        conn: &mut PgConnection,
        equipment_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_reservation: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM equipment_bookings
             WHERE equipment_id = $1
               AND status IN ('RESERVED', 'IN_USE')
               AND start_time < $3
               AND end_time > $2
               AND ($4::uuid IS NULL OR reservation_id <> $4)
             ORDER BY start_time
             LIMIT 1"
        );

        sqlx::query_as::<_, EquipmentBooking>(&query)
            .bind(equipment_id)
            .bind(start)
            .bind(end)
            .bind(exclude_reservation)
            .fetch_optional(conn)
            .await
    }

    /// Moves the active bookings of a reservation along with it
    pub async fn reschedule_for_reservation(
        conn: &mut PgConnection,
        reservation_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment_bookings
             SET start_time = $2, end_time = $3, updated_at = NOW()
             WHERE reservation_id = $1 AND status IN ('RESERVED', 'IN_USE')",
        )
        .bind(reservation_id)
        .bind(start)
        .bind(end)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marks every booking of the reservation as returned
    pub async fn release_for_reservation(
        conn: &mut PgConnection,
        reservation_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE equipment_bookings
             SET status = 'RETURNED', updated_at = NOW()
             WHERE reservation_id = $1 AND status <> 'RETURNED'",
        )
        .bind(reservation_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
