//! Role-claim checks for route gating.

use crate::{api::models::users::CurrentUser, errors::Error};

/// Role required for mutating management endpoints.
pub const ADMIN_ROLE: &str = "Admin";

/// Check that the caller's token carries the given role claim.
///
/// Failing this check is a 403: the caller is known, they just can't do
/// this — distinct from the 401 of a missing or invalid token.
pub fn require_role(user: &CurrentUser, role: &str) -> Result<(), Error> {
    if user.has_role(role) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions { role: role.to_string() })
    }
}

/// Shorthand for the Admin gate on mutating routes.
pub fn require_admin(user: &CurrentUser) -> Result<(), Error> {
    require_role(user, ADMIN_ROLE)
}
