/// Price quotes in minor currency units
///
/// Hourly rates are prorated to the second and rounded half up. Equipment
/// without an hourly rate falls back to its daily rate per started day.

use chrono::{DateTime, Utc};

const SECONDS_PER_HOUR: i128 = 3_600;
const SECONDS_PER_DAY: i128 = 86_400;

/// Rates of one piece of equipment on a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentRate {
    pub hourly_rate_cents: Option<i64>,
    pub daily_rate_cents: Option<i64>,
    pub quantity: i32,
}

/// `rate × seconds / 3600`, rounded half up
pub fn prorate_hourly(rate_cents: i64, seconds: i64) -> i64 {
    let cents = (i128::from(rate_cents) * i128::from(seconds) + SECONDS_PER_HOUR / 2)
        / SECONDS_PER_HOUR;
    saturate(cents)
}

/// Number of started days in `seconds`, at least one for a non-empty span
pub fn started_days(seconds: i64) -> i64 {
    if seconds <= 0 {
        return 0;
    }
    saturate((i128::from(seconds) + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
}

/// Cost of one equipment line over `seconds`
pub fn equipment_cost(rate: &EquipmentRate, seconds: i64) -> i64 {
    let quantity = i64::from(rate.quantity.max(1));

    match (rate.hourly_rate_cents, rate.daily_rate_cents) {
        (Some(hourly), _) => prorate_hourly(hourly, seconds).saturating_mul(quantity),
        (None, Some(daily)) => daily
            .saturating_mul(started_days(seconds))
            .saturating_mul(quantity),
        (None, None) => 0,
    }
}

/// Total for a studio at `studio_rate_cents` per hour plus equipment
pub fn quote_price(
    studio_rate_cents: i64,
    equipment: &[EquipmentRate],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> i64 {
    let seconds = (end - start).num_seconds().max(0);

    equipment
        .iter()
        .fold(prorate_hourly(studio_rate_cents, seconds), |total, rate| {
            total.saturating_add(equipment_cost(rate, seconds))
        })
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
