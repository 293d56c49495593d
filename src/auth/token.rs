//! Bearer token creation and verification.
//!
//! Tokens are HS256 JWTs signed with the shared `secret_key`. Claims carry
//! the subject's identity plus a snapshot of their role names taken from
//! the store at issuance time; validation checks signature, issuer,
//! audience, and expiry with zero leeway.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    api::models::users::CurrentUser,
    config::Config,
    db::handlers::Roles,
    db::models::users::UserDBResponse,
    errors::Error,
    types::{TokenId, UserId},
};

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,        // Subject (user ID)
    pub email: String,      // Normalized email
    pub jti: TokenId,       // Unique token ID (auditing / future revocation)
    pub iss: String,        // Issuer
    pub aud: String,        // Audience
    pub iat: i64,           // Issued at
    pub exp: i64,           // Expiration time
    #[serde(default)]
    pub roles: Vec<String>, // One entry per role name held at issuance
}

impl AccessClaims {
    /// Create new claims for a user with the given role-name snapshot
    pub fn new(user: &UserDBResponse, roles: Vec<String>, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.auth.token.expiry;

        Self {
            sub: user.id,
            email: user.email.to_string(),
            jti: Uuid::new_v4(),
            iss: config.auth.token.issuer.clone(),
            aud: config.auth.token.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            roles,
        }
    }
}

impl From<AccessClaims> for CurrentUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
        }
    }
}

/// Sign a token for a user with an explicit role snapshot
pub fn create_access_token(user: &UserDBResponse, roles: Vec<String>, config: &Config) -> Result<String, Error> {
    let claims = AccessClaims::new(user, roles, config);
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "sign access token: secret_key is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create JWT: {e}"),
    })
}

/// Issue a token for a user, resolving their current roles from the store.
///
/// The role set is a snapshot: assignments changed after issuance don't
/// affect outstanding tokens until they expire.
pub async fn issue_token(db: &mut SqliteConnection, user: &UserDBResponse, config: &Config) -> Result<String, Error> {
    let roles = Roles::new(db).roles_for_user(user.id).await?;
    let role_names = roles.into_iter().map(|r| r.name).collect();
    create_access_token(user, role_names, config)
}

/// Verify and decode an access token
pub fn verify_access_token(token: &str, config: &Config) -> Result<AccessClaims, Error> {
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "verify access token: secret_key is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // jsonwebtoken defaults to 60s of clock-skew tolerance; expiry here is
    // exact, so a token one second past exp is already invalid.
    validation.leeway = 0;
    validation.set_issuer(&[&config.auth.token.issuer]);
    validation.set_audience(&[&config.auth.token.audience]);

    let token_data = decode::<AccessClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        // Catch-all for any future error variants (default to server error for safety)
        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Email;

    fn create_test_config() -> Config {
        Config {
            secret_key: Some("test-secret-key-for-jwt".to_string()),
            ..Default::default()
        }
    }

    fn create_test_user() -> UserDBResponse {
        let now = Utc::now();
        UserDBResponse {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: Email::parse("test@example.com").unwrap(),
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_verify_access_token() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_access_token(&user, vec!["Admin".to_string()], &config).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = verify_access_token(&token, &config).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.roles, vec!["Admin".to_string()]);
        assert_eq!(claims.iss, config.auth.token.issuer);
        assert_eq!(claims.aud, config.auth.token.audience);
    }

    #[test]
    fn test_role_snapshot_is_exact() {
        let config = create_test_config();
        let user = create_test_user();

        // A user with one role carries exactly one role claim
        let token = create_access_token(&user, vec!["Admin".to_string()], &config).unwrap();
        let claims = verify_access_token(&token, &config).unwrap();
        assert_eq!(claims.roles.len(), 1);

        // A user with no roles carries zero role claims
        let token = create_access_token(&user, vec![], &config).unwrap();
        let claims = verify_access_token(&token, &config).unwrap();
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_each_token_gets_unique_id() {
        let config = create_test_config();
        let user = create_test_user();

        let first = verify_access_token(&create_access_token(&user, vec![], &config).unwrap(), &config).unwrap();
        let second = verify_access_token(&create_access_token(&user, vec![], &config).unwrap(), &config).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_verify_invalid_token() {
        let config = create_test_config();

        let result = verify_access_token("invalid.token.here", &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let mut config = create_test_config();
        let user = create_test_user();

        // Create token with one secret
        let token = create_access_token(&user, vec![], &config).unwrap();

        // Try to verify with different secret
        config.secret_key = Some("different-secret".to_string());
        let result = verify_access_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let user = create_test_user();

        // Manually create a token that expired one second ago - with zero
        // leeway that's already too late
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.to_string(),
            jti: Uuid::new_v4(),
            iss: config.auth.token.issuer.clone(),
            aud: config.auth.token.audience.clone(),
            iat: (now - chrono::Duration::seconds(60)).timestamp(),
            exp: (now - chrono::Duration::seconds(1)).timestamp(),
            roles: vec![],
        };

        let secret_key = config.secret_key.as_ref().unwrap();
        let key = EncodingKey::from_secret(secret_key.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = verify_access_token(&token, &config);
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_wrong_issuer_or_audience() {
        let mut config = create_test_config();
        let user = create_test_user();

        let token = create_access_token(&user, vec![], &config).unwrap();

        config.auth.token.issuer = "someone-else".to_string();
        assert!(matches!(verify_access_token(&token, &config).unwrap_err(), Error::Unauthenticated { .. }));

        let mut config = create_test_config();
        config.auth.token.audience = "other-audience".to_string();
        assert!(matches!(verify_access_token(&token, &config).unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_verify_malformed_token() {
        let config = create_test_config();

        // Test various malformed tokens
        let malformed_tokens = vec!["not.a.token", "invalid", "", "too.many.parts.in.this.token"];

        for token in malformed_tokens {
            let result = verify_access_token(token, &config);
            assert!(
                matches!(result.unwrap_err(), Error::Unauthenticated { .. }),
                "Expected Unauthenticated error for token: {}",
                token
            );
        }
    }
}
