/// Weekly studio opening hours
///
/// One row per (studio, weekday), enforced by the
/// `availabilities_studio_day_key` unique constraint. Weekdays follow the
/// 0 = Sunday … 6 = Saturday convention. A `close_time` of `00:00` means
/// the studio stays open until midnight.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Seconds in a day; the close bound of a window open until midnight
pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Availability {
    pub id: Uuid,
    pub studio_id: Uuid,
    pub day_of_week: i16,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One weekday's opening hours as supplied by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub day_of_week: i16,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl AvailabilityWindow {
    /// Opening time as seconds from midnight
    pub fn open_seconds(&self) -> u32 {
        self.open_time.num_seconds_from_midnight()
    }

    /// Closing time as seconds from midnight, `00:00` counting as end of day
    pub fn close_seconds(&self) -> u32 {
        match self.close_time.num_seconds_from_midnight() {
            0 => SECONDS_PER_DAY,
            secs => secs,
        }
    }

    /// Checks the weekday range and that the window is not empty
    pub fn validate(&self) -> Result<(), String> {
        if !(0..=6).contains(&self.day_of_week) {
            return Err(format!(
                "day_of_week must be between 0 (Sunday) and 6 (Saturday), got {}",
                self.day_of_week
            ));
        }
        if self.close_seconds() <= self.open_seconds() {
            return Err(format!(
                "close_time must be after open_time on day {}",
                self.day_of_week
            ));
        }
        Ok(())
    }
}

impl From<&Availability> for AvailabilityWindow {
    fn from(row: &Availability) -> Self {
        Self {
            day_of_week: row.day_of_week,
            open_time: row.open_time,
            close_time: row.close_time,
            is_available: row.is_available,
        }
    }
}

/// Validates a full weekly schedule: each window valid, no weekday twice
pub fn validate_schedule(windows: &[AvailabilityWindow]) -> Result<(), String> {
    let mut seen = [false; 7];

    for window in windows {
        window.validate()?;
        let day = window.day_of_week as usize;
        if seen[day] {
            return Err(format!("day_of_week {} listed more than once", window.day_of_week));
        }
        seen[day] = true;
    }

    Ok(())
}

const AVAILABILITY_COLUMNS: &str =
    "id, studio_id, day_of_week, open_time, close_time, is_available, created_at, updated_at";

impl Availability {
    pub async fn list_for_studio(pool: &PgPool, studio_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {AVAILABILITY_COLUMNS} FROM availabilities
             WHERE studio_id = $1 ORDER BY day_of_week"
        );

        sqlx::query_as::<_, Availability>(&query)
            .bind(studio_id)
            .fetch_all(pool)
            .await
    }

    /// Same as [`Availability::list_for_studio`] on a transaction connection
    pub async fn list_for_studio_in(
        conn: &mut PgConnection,
        studio_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {AVAILABILITY_COLUMNS} FROM availabilities
             WHERE studio_id = $1 ORDER BY day_of_week"
        );

        sqlx::query_as::<_, Availability>(&query)
            .bind(studio_id)
            .fetch_all(conn)
            .await
    }

    /// Replaces the studio's whole weekly schedule
    ///
    /// Must run inside a transaction so readers never see a half-written week.
    pub async fn replace_for_studio(
        conn: &mut PgConnection,
        studio_id: Uuid,
        windows: &[AvailabilityWindow],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query("DELETE FROM availabilities WHERE studio_id = $1")
            .bind(studio_id)
            .execute(&mut *conn)
            .await?;

        let query = format!(
            "INSERT INTO availabilities (studio_id, day_of_week, open_time, close_time, is_available)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {AVAILABILITY_COLUMNS}"
        );

        let mut rows = Vec::with_capacity(windows.len());
        for window in windows {
            let row = sqlx::query_as::<_, Availability>(&query)
                .bind(studio_id)
                .bind(window.day_of_week)
                .bind(window.open_time)
                .bind(window.close_time)
                .bind(window.is_available)
                .fetch_one(&mut *conn)
                .await?;
            rows.push(row);
        }

        rows.sort_by_key(|row| row.day_of_week);
        Ok(rows)
    }
}
