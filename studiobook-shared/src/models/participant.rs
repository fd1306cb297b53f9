/// People invited to a reservation besides its author
///
/// Keyed by `(reservation_id, user_id)`, so a user appears at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Producer,
    Engineer,
    Musician,
    Artist,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReservationParticipant {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub created_at: DateTime<Utc>,
}

impl ReservationParticipant {
    /// Adds a participant; adding the same user twice keeps the first role
    pub async fn insert(
        conn: &mut PgConnection,
        reservation_id: Uuid,
        user_id: Uuid,
        role: ParticipantRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReservationParticipant>(
            "INSERT INTO reservation_participants (reservation_id, user_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT (reservation_id, user_id) DO NOTHING
             RETURNING reservation_id, user_id, role, created_at",
        )
        .bind(reservation_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(conn)
        .await
    }

    pub async fn list_for_reservation(
        pool: &PgPool,
        reservation_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ReservationParticipant>(
            "SELECT reservation_id, user_id, role, created_at
             FROM reservation_participants
             WHERE reservation_id = $1
             ORDER BY created_at",
        )
        .bind(reservation_id)
        .fetch_all(pool)
        .await
    }

    pub async fn is_participant(
        pool: &PgPool,
        reservation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM reservation_participants
                WHERE reservation_id = $1 AND user_id = $2
            )",
        )
        .bind(reservation_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
