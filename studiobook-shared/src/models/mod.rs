/// Database models for StudioBook
///
/// Each model owns its SQL. Plain reads take a `&PgPool`; anything that
/// must run inside a caller's transaction takes a `&mut PgConnection`.
///
/// # Models
///
/// - `user`: Accounts and roles
/// - `studio`: Bookable rooms
/// - `availability`: Weekly opening hours per studio
/// - `equipment`: Gear attached to a studio
/// - `reservation`: Studio bookings and their lifecycle
/// - `equipment_booking`: Equipment held by a reservation
/// - `participant`: Users invited to a reservation
/// - `payment`: Payment outcome per reservation
/// - `notification`: In-app inbox
/// - `revoked_token`: Logged-out refresh tokens
///
/// # Example
///
/// ```no_run
/// use studiobook_shared::models::user::{CreateUser, User, UserRole};
/// use studiobook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "artist@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Nina".to_string(),
///     last_name: "Simone".to_string(),
///     phone: None,
///     role: UserRole::Artist,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod availability;
pub mod equipment;
pub mod equipment_booking;
pub mod notification;
pub mod participant;
pub mod payment;
pub mod reservation;
pub mod revoked_token;
pub mod studio;
pub mod user;
