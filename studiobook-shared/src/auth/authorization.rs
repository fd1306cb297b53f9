/// Role and ownership checks
///
/// Permission model:
///
/// 1. **Role**: `STUDIO_OWNER` and `ADMIN` may list studios
/// 2. **Ownership**: a studio, its equipment and its availability are
///    managed by the studio's owner
/// 3. **Admin override**: `ADMIN` passes every ownership check
///
/// Reservations are visible to their author, their participants, the
/// studio owner and admins.
///
/// # Example
///
/// ```
/// use studiobook_shared::auth::authorization::{require_owner_or_admin, require_studio_creator};
/// use studiobook_shared::auth::middleware::AuthContext;
/// use studiobook_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let owner = AuthContext { user_id: Uuid::new_v4(), role: UserRole::StudioOwner };
/// assert!(require_studio_creator(&owner).is_ok());
/// assert!(require_owner_or_admin(&owner, owner.user_id).is_ok());
/// assert!(require_owner_or_admin(&owner, Uuid::new_v4()).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions: requires one of {required}")]
    InsufficientRole { required: String },

    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Passes if the caller has any of `allowed`
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        return Ok(());
    }

    Err(AuthzError::InsufficientRole {
        required: allowed
            .iter()
            .map(UserRole::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Only studio owners and admins may create studios
pub fn require_studio_creator(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, &[UserRole::StudioOwner, UserRole::Admin])
}

/// Passes for the resource owner and for admins
pub fn require_owner_or_admin(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.is_admin() || auth.user_id == owner_id {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

/// Facts about a reservation needed to decide who may see it
#[derive(Debug, Clone, Copy)]
pub struct ReservationAccess {
    pub author_id: Uuid,
    pub studio_owner_id: Uuid,
    pub caller_is_participant: bool,
}

impl ReservationAccess {
    /// Studio owner or admin: may confirm, complete and record payments
    pub fn can_manage(&self, auth: &AuthContext) -> bool {
        auth.is_admin() || auth.user_id == self.studio_owner_id
    }

    /// Author, studio owner or admin: may change the reservation
    pub fn can_edit(&self, auth: &AuthContext) -> bool {
        self.can_manage(auth) || auth.user_id == self.author_id
    }

    /// Anyone who can edit, plus participants
    pub fn can_view(&self, auth: &AuthContext) -> bool {
        self.can_edit(auth) || self.caller_is_participant
    }
}

pub fn require_reservation_view(
    auth: &AuthContext,
    access: &ReservationAccess,
) -> Result<(), AuthzError> {
    if access.can_view(auth) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

pub fn require_reservation_edit(
    auth: &AuthContext,
    access: &ReservationAccess,
) -> Result<(), AuthzError> {
    if access.can_edit(auth) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}
