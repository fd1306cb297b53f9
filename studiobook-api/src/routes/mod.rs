/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Liveness and database checks
/// - `docs`: Endpoint overview served at `/api`
/// - `auth`: Registration, login, tokens and profile
/// - `studios`: Studios and their weekly availability
/// - `bookings`: Reservations and payments
/// - `equipment`: Studio equipment
/// - `notifications`: Per-user notifications

pub mod auth;
pub mod bookings;
pub mod docs;
pub mod equipment;
pub mod health;
pub mod notifications;
pub mod studios;
