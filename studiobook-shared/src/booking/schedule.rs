/// Interval rules for reservations
///
/// All intervals are half-open `[start, end)` in UTC. Opening hours are
/// evaluated per UTC calendar day.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

use crate::models::availability::AvailabilityWindow;

/// Longest reservation accepted, in days
pub const MAX_RESERVATION_DAYS: i64 = 31;

/// Rejects empty or inverted intervals
pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    end > start
}

/// Whether `[start, end)` fits within [`MAX_RESERVATION_DAYS`]
pub fn within_max_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    end - start <= Duration::days(MAX_RESERVATION_DAYS)
}

/// Half-open overlap: intervals that only touch do not overlap
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Checks that opening hours cover every part of `[start, end)`
///
/// The interval is cut at UTC midnights. Each piece must fall inside the
/// window of its weekday, and that window must be marked available. A
/// booking running past midnight therefore needs the first day to close
/// at `00:00` and the next day to open at `00:00`.
pub fn covers_interval(
    windows: &[AvailabilityWindow],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    if !validate_range(start, end) || !within_max_duration(start, end) {
        return false;
    }

    let mut day = start.date_naive();

    loop {
        let day_start = day.and_time(NaiveTime::MIN).and_utc();
        if day_start >= end {
            return true;
        }
        let day_end = day_start + Duration::days(1);

        let piece_start = start.max(day_start);
        let piece_end = end.min(day_end);

        if piece_start < piece_end {
            let from_ms = (piece_start - day_start).num_milliseconds();
            let to_ms = (piece_end - day_start).num_milliseconds();
            let weekday = day.weekday().num_days_from_sunday() as i16;

            let covered = windows.iter().any(|window| {
                window.day_of_week == weekday
                    && window.is_available
                    && i64::from(window.open_seconds()) * 1000 <= from_ms
                    && to_ms <= i64::from(window.close_seconds()) * 1000
            });

            if !covered {
                return false;
            }
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => return false,
        };
    }
}
