//! API request/response models for permissions.

use crate::api::models::validate_length;
use crate::db::models::permissions::{PermissionCreateDBRequest, PermissionDBResponse, PermissionUpdateDBRequest};
use crate::errors::Error;
use crate::types::PermissionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCreate {
    pub name: String,
}

impl PermissionCreate {
    pub fn validate(&self) -> Result<PermissionCreateDBRequest, Error> {
        if let Some(e) = validate_length("name", &self.name, 3, 50) {
            return Err(Error::Validation { errors: vec![e] });
        }
        Ok(PermissionCreateDBRequest { name: self.name.clone() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionUpdate {
    pub name: Option<String>,
}

impl PermissionUpdate {
    pub fn validate(&self) -> Result<PermissionUpdateDBRequest, Error> {
        if let Some(name) = &self.name {
            if let Some(e) = validate_length("name", name, 3, 50) {
                return Err(Error::Validation { errors: vec![e] });
            }
        }
        Ok(PermissionUpdateDBRequest { name: self.name.clone() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub id: PermissionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<PermissionDBResponse> for PermissionResponse {
    fn from(db: PermissionDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            created_at: db.created_at,
        }
    }
}
