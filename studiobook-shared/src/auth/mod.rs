/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and strength rules
/// - [`jwt`]: Access/refresh token issue and validation
/// - [`middleware`]: The `AuthContext` extractor and bearer parsing
/// - [`authorization`]: Role and ownership checks
///
/// # Example
///
/// ```no_run
/// use studiobook_shared::auth::jwt::issue_token_pair;
/// use studiobook_shared::auth::password::{hash_password, verify_password};
/// use studiobook_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Mix&Master42")?;
/// assert!(verify_password("Mix&Master42", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), UserRole::Artist, "an-example-secret-of-at-least-32-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
