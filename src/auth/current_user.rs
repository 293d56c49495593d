//! Extractor for the authenticated user on protected routes.
//!
//! Per-request authentication is stateless: the bearer token is the only
//! credential, and everything downstream handlers see (identity + role
//! claims) is decoded from it. A request without a token is simply
//! unauthenticated; handlers that don't use this extractor are public.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::token,
    errors::{Error, Result},
};

/// Pull the bearer token out of the Authorization header.
///
/// Returns:
/// - None: No Authorization header, or not a Bearer scheme
/// - Some(Ok(token)): A bearer token is present
/// - Some(Err(error)): Header present but unreadable
fn extract_bearer_token(parts: &Parts) -> Option<Result<&str>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    auth_str.strip_prefix("Bearer ").map(Ok)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = match extract_bearer_token(parts) {
            Some(Ok(token)) => token,
            Some(Err(e)) => return Err(e),
            None => {
                trace!("No bearer token presented");
                return Err(Error::Unauthenticated { message: None });
            }
        };

        let claims = token::verify_access_token(token, &state.config)?;
        let user = CurrentUser::from(claims);
        debug!("Authenticated user: {}", user.id);
        Ok(user)
    }
}
