//! Database models for permissions.

use crate::types::PermissionId;
use chrono::{DateTime, Utc};

/// Database request for creating a new permission
#[derive(Debug, Clone)]
pub struct PermissionCreateDBRequest {
    pub name: String,
}

/// Database request for updating a permission
#[derive(Debug, Clone, Default)]
pub struct PermissionUpdateDBRequest {
    pub name: Option<String>,
}

/// Database response for a permission
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionDBResponse {
    pub id: PermissionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
