/// Equipment model and database operations
///
/// Every item belongs to exactly one studio and is booked as a single unit.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE equipment (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     studio_id UUID NOT NULL REFERENCES studios(id) ON DELETE CASCADE,
///     name VARCHAR(200) NOT NULL,
///     description TEXT,
///     brand VARCHAR(100),
///     model VARCHAR(100),
///     equipment_type equipment_type NOT NULL,
///     status equipment_status NOT NULL DEFAULT 'AVAILABLE',
///     hourly_rate_cents BIGINT,
///     daily_rate_cents BIGINT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "equipment_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentType {
    Microphone,
    Speaker,
    Instrument,
    Mixer,
    Amplifier,
    Headphones,
    Camera,
    Lighting,
    Computer,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "equipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    OutOfOrder,
}

impl EquipmentStatus {
    /// Whether the item can be attached to new reservations
    ///
    /// `IN_USE` only describes the current moment; future bookings are
    /// decided by the overlap check.
    pub fn is_bookable(&self) -> bool {
        matches!(self, EquipmentStatus::Available | EquipmentStatus::InUse)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub studio_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub equipment_type: EquipmentType,
    pub status: EquipmentStatus,
    pub hourly_rate_cents: Option<i64>,
    pub daily_rate_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEquipment {
    pub studio_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub equipment_type: EquipmentType,
    pub status: EquipmentStatus,
    pub hourly_rate_cents: Option<i64>,
    pub daily_rate_cents: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub equipment_type: Option<EquipmentType>,
    pub status: Option<EquipmentStatus>,
    pub hourly_rate_cents: Option<i64>,
    pub daily_rate_cents: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub studio_id: Option<Uuid>,
    pub equipment_type: Option<EquipmentType>,
    pub status: Option<EquipmentStatus>,
}

const EQUIPMENT_COLUMNS: &str = "id, studio_id, name, description, brand, model, equipment_type, \
     status, hourly_rate_cents, daily_rate_cents, created_at, updated_at";

impl EquipmentFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");

        if let Some(studio_id) = self.studio_id {
            builder.push(" AND studio_id = ").push_bind(studio_id);
        }
        if let Some(equipment_type) = self.equipment_type {
            builder.push(" AND equipment_type = ").push_bind(equipment_type);
        }
        if let Some(status) = self.status {
            builder.push(" AND status = ").push_bind(status);
        }
    }
}

impl Equipment {
    pub async fn create(pool: &PgPool, data: CreateEquipment) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO equipment (studio_id, name, description, brand, model, equipment_type,
                                    status, hourly_rate_cents, daily_rate_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {EQUIPMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Equipment>(&query)
            .bind(data.studio_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.brand)
            .bind(data.model)
            .bind(data.equipment_type)
            .bind(data.status)
            .bind(data.hourly_rate_cents)
            .bind(data.daily_rate_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1");

        sqlx::query_as::<_, Equipment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_studio(pool: &PgPool, studio_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE studio_id = $1 ORDER BY name"
        );

        sqlx::query_as::<_, Equipment>(&query)
            .bind(studio_id)
            .fetch_all(pool)
            .await
    }

    /// Locks the given items for the rest of the transaction
    ///
    /// Rows are locked in id order so two transactions asking for the same
    /// items cannot deadlock. Unknown ids are simply absent from the result.
    pub async fn lock_many(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment
             WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );

        sqlx::query_as::<_, Equipment>(&query)
            .bind(ids)
            .fetch_all(conn)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        filter: &EquipmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment"));
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        builder.build_query_as::<Equipment>().fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool, filter: &EquipmentFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM equipment");
        filter.push_conditions(&mut builder);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateEquipment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE equipment
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 brand = COALESCE($4, brand),
                 model = COALESCE($5, model),
                 equipment_type = COALESCE($6, equipment_type),
                 status = COALESCE($7, status),
                 hourly_rate_cents = COALESCE($8, hourly_rate_cents),
                 daily_rate_cents = COALESCE($9, daily_rate_cents),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {EQUIPMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Equipment>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.brand)
            .bind(data.model)
            .bind(data.equipment_type)
            .bind(data.status)
            .bind(data.hourly_rate_cents)
            .bind(data.daily_rate_cents)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM equipment")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&EquipmentStatus::OutOfOrder).unwrap(),
            "\"OUT_OF_ORDER\""
        );
        let kind: EquipmentType = serde_json::from_str("\"HEADPHONES\"").unwrap();
        assert_eq!(kind, EquipmentType::Headphones);
    }

    #[test]
    fn test_bookable_statuses() {
        assert!(EquipmentStatus::Available.is_bookable());
        assert!(EquipmentStatus::InUse.is_bookable());
        assert!(!EquipmentStatus::Maintenance.is_bookable());
        assert!(!EquipmentStatus::OutOfOrder.is_bookable());
    }

    #[test]
    fn test_filter_conditions() {
        let filter = EquipmentFilter {
            studio_id: Some(Uuid::new_v4()),
            status: Some(EquipmentStatus::Available),
            ..Default::default()
        };

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM equipment");
        filter.push_conditions(&mut builder);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM equipment WHERE TRUE AND studio_id = $1 AND status = $2"
        );
    }
}
