/// Reservation rules
///
/// - [`schedule`]: interval validity, overlap and opening-hours coverage
/// - [`pricing`]: price quotes from studio and equipment rates
/// - [`admission`]: the transactional check that admits new reservations
/// - [`lifecycle`]: rescheduling, status changes and payments
///
/// The pure rules in `schedule` and `pricing` have no store access and are
/// what the transactional code in `admission` and `lifecycle` builds on.
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use studiobook_shared::booking::admission::{admit_reservation, ReservationRequest};
/// use uuid::Uuid;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let start = Utc::now() + Duration::days(1);
/// let admitted = admit_reservation(&pool, ReservationRequest {
///     studio_id: Uuid::new_v4(),
///     user_id: Uuid::new_v4(),
///     start,
///     end: start + Duration::hours(2),
///     equipment: vec![],
///     participants: vec![],
///     notes: None,
/// }).await?;
/// println!("{}", admitted.reservation.id);
/// # Ok(())
/// # }
/// ```

pub mod admission;
pub mod lifecycle;
pub mod pricing;
pub mod schedule;

pub use admission::{admit_reservation, AdmissionError};
pub use lifecycle::{record_payment, update_payment, update_reservation};
