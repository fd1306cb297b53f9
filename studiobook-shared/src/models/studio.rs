/// Studio model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE studios (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(200) NOT NULL,
///     description TEXT,
///     address VARCHAR(255) NOT NULL,
///     city VARCHAR(100) NOT NULL,
///     postal_code VARCHAR(20) NOT NULL,
///     country VARCHAR(100) NOT NULL,
///     capacity INTEGER NOT NULL CHECK (capacity > 0),
///     hourly_rate_cents BIGINT NOT NULL CHECK (hourly_rate_cents >= 0),
///     currency CHAR(3) NOT NULL DEFAULT 'EUR',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `capacity` is informational: a studio holds one reservation at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Studio {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,

    /// Number of people the room fits
    pub capacity: i32,

    /// Price per hour in minor currency units
    pub hourly_rate_cents: i64,

    /// ISO-4217 code
    pub currency: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateStudio {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub capacity: i32,
    pub hourly_rate_cents: i64,
    pub currency: String,
}

/// Fields that can change on a studio; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateStudio {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub capacity: Option<i32>,
    pub hourly_rate_cents: Option<i64>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct StudioFilter {
    /// Case-insensitive city match
    pub city: Option<String>,
    pub owner_id: Option<Uuid>,
    pub min_capacity: Option<i32>,
    pub max_hourly_rate_cents: Option<i64>,
    pub is_active: Option<bool>,
}

const STUDIO_COLUMNS: &str = "id, owner_id, name, description, address, city, postal_code, \
     country, capacity, hourly_rate_cents, currency, is_active, created_at, updated_at";

impl StudioFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");

        if let Some(city) = &self.city {
            builder.push(" AND LOWER(city) = LOWER(").push_bind(city.clone()).push(")");
        }
        if let Some(owner_id) = self.owner_id {
            builder.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(min_capacity) = self.min_capacity {
            builder.push(" AND capacity >= ").push_bind(min_capacity);
        }
        if let Some(max_rate) = self.max_hourly_rate_cents {
            builder.push(" AND hourly_rate_cents <= ").push_bind(max_rate);
        }
        if let Some(is_active) = self.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
    }
}

impl Studio {
    /// Inserts a studio inside the caller's transaction
    pub async fn create(conn: &mut PgConnection, data: CreateStudio) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO studios (owner_id, name, description, address, city, postal_code,
                                  country, capacity, hourly_rate_cents, currency)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {STUDIO_COLUMNS}"
        );

        sqlx::query_as::<_, Studio>(&query)
            .bind(data.owner_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.address)
            .bind(data.city)
            .bind(data.postal_code)
            .bind(data.country)
            .bind(data.capacity)
            .bind(data.hourly_rate_cents)
            .bind(data.currency)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {STUDIO_COLUMNS} FROM studios WHERE id = $1");

        sqlx::query_as::<_, Studio>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Reads the studio row and holds a row lock until the transaction ends
    ///
    /// Every writer that books the studio takes this lock first, which
    /// serializes reservations of the same room.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {STUDIO_COLUMNS} FROM studios WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, Studio>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lists studios, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &StudioFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {STUDIO_COLUMNS} FROM studios"));
        filter.push_conditions(&mut builder);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        builder.build_query_as::<Studio>().fetch_all(pool).await
    }

    /// Counts studios matching a filter
    pub async fn count(pool: &PgPool, filter: &StudioFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM studios");
        filter.push_conditions(&mut builder);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Applies an update inside the caller's transaction
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateStudio,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE studios
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 address = COALESCE($4, address),
                 city = COALESCE($5, city),
                 postal_code = COALESCE($6, postal_code),
                 country = COALESCE($7, country),
                 capacity = COALESCE($8, capacity),
                 hourly_rate_cents = COALESCE($9, hourly_rate_cents),
                 currency = COALESCE($10, currency),
                 is_active = COALESCE($11, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {STUDIO_COLUMNS}"
        );

        sqlx::query_as::<_, Studio>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.address)
            .bind(data.city)
            .bind(data.postal_code)
            .bind(data.country)
            .bind(data.capacity)
            .bind(data.hourly_rate_cents)
            .bind(data.currency)
            .bind(data.is_active)
            .fetch_optional(conn)
            .await
    }

    /// Deletes a studio; equipment, availability and reservations cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM studios WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM studios")
            .fetch_one(pool)
            .await
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}
