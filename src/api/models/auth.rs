//! API request/response models for authentication.

use crate::api::models::users::{CurrentUser, UserResponse};
use crate::types::{TokenId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name; defaults to the email local part when omitted.
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Response for `GET /auth/me`: who the token says you are, and what it
/// says you can do. Built purely from the validated claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub identity: IdentityResponse,
    pub claims: ClaimsResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimsResponse {
    pub token_id: TokenId,
    pub roles: Vec<String>,
}

impl From<CurrentUser> for MeResponse {
    fn from(user: CurrentUser) -> Self {
        Self {
            identity: IdentityResponse {
                id: user.id,
                email: user.email,
            },
            claims: ClaimsResponse {
                token_id: user.token_id,
                roles: user.roles,
            },
        }
    }
}
