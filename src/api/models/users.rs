//! API request/response models for users.

use crate::api::models::validate_length;
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest};
use crate::errors::{Error, FieldError};
use crate::types::{Email, PasswordHash, TokenId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// User request models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

impl UserCreate {
    /// Validate and normalize, producing the store request (minus the
    /// password, which is hashed separately at the boundary).
    pub fn validate(&self) -> Result<ValidatedUserCreate, Error> {
        let mut errors = Vec::new();

        if let Some(e) = validate_length("name", &self.name, 3, 100) {
            errors.push(e);
        }

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(ValidatedUserCreate {
            name: self.name.clone(),
            email: email.expect("validated above"),
        })
    }
}

/// A `UserCreate` that has passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedUserCreate {
    pub name: String,
    pub email: Email,
}

impl ValidatedUserCreate {
    pub fn into_db_request(self, password_hash: Option<PasswordHash>) -> UserCreateDBRequest {
        UserCreateDBRequest {
            name: self.name,
            email: self.email,
            password_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    /// Validate provided fields, producing the store request (minus the
    /// password, hashed separately).
    pub fn validate(&self) -> Result<UserUpdateDBRequest, Error> {
        let mut errors = Vec::new();

        if let Some(name) = &self.name {
            if let Some(e) = validate_length("name", name, 3, 100) {
                errors.push(e);
            }
        }

        let email = match &self.email {
            Some(raw) => match Email::parse(raw) {
                Ok(email) => Some(email),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(Error::Validation { errors });
        }

        Ok(UserUpdateDBRequest {
            name: self.name.clone(),
            email,
            password_hash: None,
        })
    }
}

// User response models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        // The password hash stays behind at this boundary
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// The authenticated caller as decoded from their bearer token.
///
/// Everything here comes from token claims, not the store: the roles are
/// the snapshot taken at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub roles: Vec<String>,
    pub token_id: TokenId,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
