//! Database models for roles and their join rows.

use crate::types::{PermissionId, RoleId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new role
#[derive(Debug, Clone)]
pub struct RoleCreateDBRequest {
    pub name: String,
}

/// Database request for updating a role
#[derive(Debug, Clone, Default)]
pub struct RoleUpdateDBRequest {
    pub name: Option<String>,
}

/// Database response for a role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDBResponse {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A user↔role association. Join rows have no identity beyond the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRoleDBResponse {
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// A role↔permission association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePermissionDBResponse {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}
