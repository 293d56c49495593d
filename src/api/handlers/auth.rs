use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, TokenResponse},
        users::{CurrentUser, UserResponse},
        validate_length,
    },
    auth::{password, token},
    db::{handlers::{Repository, Users}, models::users::UserCreateDBRequest},
    errors::{Error, FieldError},
    types::Email,
};

/// Register a new user account
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<Json<AuthResponse>, Error> {
    // Check if registration is allowed
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    // Boundary validation: collect every problem before responding
    let mut errors = Vec::new();

    let email = match Email::parse(&request.email) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let password_config = &state.config.auth.password;
    if request.password.len() < password_config.min_length {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", password_config.min_length),
        ));
    }
    if request.password.len() > password_config.max_length {
        errors.push(FieldError::new(
            "password",
            format!("Password must be no more than {} characters", password_config.max_length),
        ));
    }

    if let Some(name) = &request.name {
        if let Some(e) = validate_length("name", name, 3, 100) {
            errors.push(e);
        }
    }

    if !errors.is_empty() {
        return Err(Error::Validation { errors });
    }
    let email = email.expect("validated above");

    // Fall back to the email local part when no display name was given
    let name = match request.name {
        Some(name) => name,
        None => {
            let local = email.as_str().split('@').next().unwrap_or_default();
            if local.is_empty() { "user".to_string() } else { local.to_string() }
        }
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Check if user with this email already exists
    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            name,
            email,
            password_hash: Some(password_hash),
        })
        .await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(created_user),
        message: "Registration successful".to_string(),
    }))
}

/// Login with email and password, returning a signed bearer token
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>, Error> {
    // An unparseable email can't match an account; fail exactly like a
    // wrong password so nothing about stored accounts can be inferred.
    let email = Email::parse(&request.email).map_err(|_| Error::InvalidCredentials)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Find user by email
    let user = user_repo.get_user_by_email(&email).await?.ok_or(Error::InvalidCredentials)?;

    // A user without a password hash cannot log in with credentials
    let password_hash = user.password_hash.clone().ok_or(Error::InvalidCredentials)?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::InvalidCredentials);
    }

    // Embed the current role snapshot and sign
    let token = token::issue_token(&mut pool_conn, &user, &state.config).await?;

    Ok(Json(TokenResponse { token }))
}

/// Return the caller's identity and claims as decoded from their token
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse::from(current_user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::verify_access_token;
    use crate::build_router;
    use crate::test_utils::{assign_role_by_name, create_test_config};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use sqlx::SqlitePool;

    fn test_server(pool: SqlitePool, config: crate::config::Config) -> TestServer {
        let state = AppState::builder().db(pool).config(config).build();
        TestServer::new(build_router(state)).unwrap()
    }

    fn register_body(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Test User".to_string()),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[sqlx::test]
    async fn test_register_success(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());

        let response = server
            .post("/auth/register")
            .json(&register_body(" New.User@Example.com ", "password123"))
            .await;

        response.assert_status(StatusCode::OK);
        let body: AuthResponse = response.json();
        assert_eq!(body.user.email.as_str(), "new.user@example.com");
        assert_eq!(body.message, "Registration successful");
    }

    #[sqlx::test]
    async fn test_register_duplicate_email_conflicts(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());

        server
            .post("/auth/register")
            .json(&register_body("taken@example.com", "password123"))
            .await
            .assert_status(StatusCode::OK);

        // Same address with different case and padding is still a duplicate
        let response = server
            .post("/auth/register")
            .json(&register_body("  TAKEN@example.com", "password456"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_register_validation_failures(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());

        let response = server.post("/auth/register").json(&register_body("   ", "short")).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[sqlx::test]
    async fn test_register_disabled(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.allow_registration = false;
        let server = test_server(pool, config);

        let response = server
            .post("/auth/register")
            .json(&register_body("someone@example.com", "password123"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_login_returns_signed_token_with_role_snapshot(pool: SqlitePool) {
        let config = create_test_config();
        let server = test_server(pool.clone(), config.clone());

        let response = server
            .post("/auth/register")
            .json(&register_body("login@example.com", "password123"))
            .await;
        let registered: AuthResponse = response.json();

        assign_role_by_name(&pool, registered.user.id, "Admin").await;

        let response = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "login@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;
        response.assert_status(StatusCode::OK);

        let body: TokenResponse = response.json();
        let claims = verify_access_token(&body.token, &config).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(claims.email, "login@example.com");
        assert_eq!(claims.roles, vec!["Admin".to_string()]);
        assert!(claims.exp > claims.iat);
    }

    #[sqlx::test]
    async fn test_login_failures_are_indistinguishable(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());

        server
            .post("/auth/register")
            .json(&register_body("known@example.com", "password123"))
            .await
            .assert_status(StatusCode::OK);

        // Wrong password for a real account
        let wrong_password = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "known@example.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;

        // No such account at all
        let unknown_email = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await;

        wrong_password.assert_status(StatusCode::UNAUTHORIZED);
        unknown_email.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.text(), unknown_email.text());
    }

    #[sqlx::test]
    async fn test_login_email_matching_ignores_case_and_whitespace(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.password.min_length = 3;
        let server = test_server(pool, config.clone());

        server
            .post("/auth/register")
            .json(&RegisterRequest {
                name: None,
                email: "a@x.com".to_string(),
                password: "pw1".to_string(),
            })
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "A@X.com  ".to_string(),
                password: "pw1".to_string(),
            })
            .await;
        response.assert_status(StatusCode::OK);

        let body: TokenResponse = response.json();
        let claims = verify_access_token(&body.token, &config).unwrap();
        assert_eq!(claims.email, "a@x.com");
    }

    #[sqlx::test]
    async fn test_me_exposes_identity_and_claims(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());

        server
            .post("/auth/register")
            .json(&register_body("Me@Example.com", "password123"))
            .await
            .assert_status(StatusCode::OK);

        let login: TokenResponse = server
            .post("/auth/login")
            .json(&LoginRequest {
                email: "me@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .json();

        let response = server.get("/auth/me").authorization_bearer(&login.token).await;
        response.assert_status(StatusCode::OK);

        let body: MeResponse = response.json();
        assert_eq!(body.identity.email, "me@example.com");
        assert!(body.claims.roles.is_empty());
    }

    #[sqlx::test]
    async fn test_me_requires_token(pool: SqlitePool) {
        let server = test_server(pool, create_test_config());
        server.get("/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
