//! Authentication and authorization system.
//!
//! This module provides the credential and token machinery:
//! - Password hashing and verification with Argon2id
//! - Signed bearer-token issuance and validation (HS256 JWT)
//! - The bearer-token extractor backing [`crate::api::models::users::CurrentUser`]
//! - Role-claim gating for admin-only routes
//!
//! # Authentication
//!
//! Clients authenticate once via `POST /auth/login` with email/password.
//! On success they receive a signed token embedding their identity and a
//! snapshot of their role names, which they present on subsequent requests
//! as `Authorization: Bearer <token>`.
//!
//! Role claims are resolved at issuance time: revoking a role does not
//! invalidate tokens already in flight — the configured expiry bounds how
//! long a stale snapshot can live.
//!
//! # Authorization
//!
//! Routes that only need a known caller take the `CurrentUser` extractor.
//! Mutating admin routes additionally call
//! [`permissions::require_role`] against the token's role claims; failing
//! that check is a 403, distinct from the 401 of a missing or invalid token.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Role-claim checks for route gating
//! - [`token`]: Token creation and verification

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod token;
