//! Common type definitions and credential value objects.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, RoleId, PermissionId)
//! - The [`Email`] and [`PasswordHash`] value objects
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety.
//!
//! # Value Objects
//!
//! [`Email`] and [`PasswordHash`] can only be obtained through validating
//! constructors, so a held value is always well-formed: an `Email` is
//! trimmed, lower-cased and non-empty, and a `PasswordHash` is a non-empty
//! hash string (never plaintext — hashing happens in [`crate::auth::password`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::FieldError;

// Type aliases for IDs
pub type UserId = Uuid;
pub type RoleId = Uuid;
pub type PermissionId = Uuid;
pub type TokenId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// A normalized email address.
///
/// Construction goes through [`Email::parse`], which trims surrounding
/// whitespace, lower-cases, and rejects empty input. The same rule is
/// applied on login lookup so stored and presented addresses always
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Email(String);

impl Email {
    /// Normalize and validate a raw email string.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(FieldError::new("email", "Email is required"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Email::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// An opaque password hash in PHC string format.
///
/// Only ever built from an already-hashed string ([`PasswordHash::from_hash`])
/// or read back from the store. There is deliberately no constructor taking
/// plaintext, no `Serialize` impl, and `Debug` is redacted.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap an existing hash string, rejecting empty input.
    pub fn from_hash(hash: String) -> Result<Self, FieldError> {
        if hash.trim().is_empty() {
            return Err(FieldError::new("password_hash", "Password hash is required"));
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
