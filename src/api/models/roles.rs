//! API request/response models for roles and role assignments.

use crate::api::models::validate_length;
use crate::db::models::roles::{RoleCreateDBRequest, RoleDBResponse, RolePermissionDBResponse, RoleUpdateDBRequest, UserRoleDBResponse};
use crate::errors::Error;
use crate::types::{PermissionId, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreate {
    pub name: String,
}

impl RoleCreate {
    pub fn validate(&self) -> Result<RoleCreateDBRequest, Error> {
        if let Some(e) = validate_length("name", &self.name, 3, 50) {
            return Err(Error::Validation { errors: vec![e] });
        }
        Ok(RoleCreateDBRequest { name: self.name.clone() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoleUpdate {
    pub name: Option<String>,
}

impl RoleUpdate {
    pub fn validate(&self) -> Result<RoleUpdateDBRequest, Error> {
        if let Some(name) = &self.name {
            if let Some(e) = validate_length("name", name, 3, 50) {
                return Err(Error::Validation { errors: vec![e] });
            }
        }
        Ok(RoleUpdateDBRequest { name: self.name.clone() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<RoleDBResponse> for RoleResponse {
    fn from(db: RoleDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            created_at: db.created_at,
        }
    }
}

/// A user↔role association as returned by the assignment endpoints.
///
/// Serialized flat (just the two ids): the join row has no identity of its
/// own and deliberately no embedded user/role payloads, so there is no
/// back-reference cycle to chase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleResponse {
    pub user_id: UserId,
    pub role_id: RoleId,
}

impl From<UserRoleDBResponse> for UserRoleResponse {
    fn from(db: UserRoleDBResponse) -> Self {
        Self {
            user_id: db.user_id,
            role_id: db.role_id,
        }
    }
}

/// A role↔permission association as returned by the grant endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissionResponse {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

impl From<RolePermissionDBResponse> for RolePermissionResponse {
    fn from(db: RolePermissionDBResponse) -> Self {
        Self {
            role_id: db.role_id,
            permission_id: db.permission_id,
        }
    }
}
