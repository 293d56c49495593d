//! # accessctl: Role-Based Access Control Service
//!
//! `accessctl` is a self-hostable backend for user management and
//! role-based access control. It keeps users, roles, and permissions in an
//! embedded store, authenticates users with email/password credentials,
//! and hands out signed bearer tokens that carry the caller's identity and
//! role claims.
//!
//! ## Overview
//!
//! The service fronts a classic RBAC graph: permissions are granted to
//! roles, roles are assigned to users, and both relations live in join
//! tables keyed by the entity pair so an assignment can exist at most
//! once. A token-based authentication layer sits in front: a successful
//! login resolves the user's current role set and embeds it, along with
//! the subject id, email, and a unique token id, into an HMAC-SHA256
//! signed JWT.
//!
//! Tokens carry a *snapshot* of the role set. Revoking a role does not
//! recall tokens already issued; the configured expiry bounds how long a
//! stale snapshot can circulate.
//!
//! ### Request Flow
//!
//! A client logs in at `POST /auth/login`. The credential check normalizes
//! the submitted email the same way addresses are normalized at
//! registration, verifies the password against its Argon2id hash, and
//! returns one undifferentiated error whether the email was unknown or the
//! password wrong. On success the token issuer reads the user's roles from
//! the store and returns a signed token.
//!
//! Subsequent requests present `Authorization: Bearer <token>`. Protected
//! handlers extract the caller via [`api::models::users::CurrentUser`],
//! which validates signature, issuer, audience, and expiry (with zero
//! clock-skew tolerance) and exposes the embedded claims. Mutating
//! management routes additionally require the `Admin` role claim; failing
//! that check is a 403, distinct from the 401 of a missing or bad token.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the authentication routes at
//! `/auth/*` and RESTful CRUD plus assignment endpoints for users, roles,
//! and permissions under `/api/v1/*`.
//!
//! The **authentication layer** ([`auth`]) owns password hashing, token
//! issuance/validation, and role-claim gating.
//!
//! The **database layer** ([`db`]) uses the repository pattern over SQLx
//! with the embedded SQLite driver. Join-table invariants (at most one row
//! per pair, parents must exist, deletes cascade) are enforced by the
//! schema itself, so racing writers are rejected by the store rather than
//! silently duplicated.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use accessctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = accessctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     accessctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The store is a single SQLite file (created on first start) and
//! migrations run automatically on startup:
//!
//! ```no_run
//! # use sqlx::SqlitePool;
//! # async fn example(pool: SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
//! accessctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    auth::permissions::ADMIN_ROLE,
    db::handlers::{Permissions, Repository, Roles, Users},
    db::models::{
        permissions::PermissionCreateDBRequest,
        roles::RoleCreateDBRequest,
        users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    types::Email,
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, instrument, Level};

pub use types::{PermissionId, RoleId, UserId};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the accessctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent - it will create a new admin user if one
/// doesn't exist, or update the password if the user already exists. Either
/// way the user ends up holding the `Admin` role (the role itself is
/// created on demand). Typically called during application startup so
/// there's always an admin account available.
///
/// Returns the user ID of the created or existing admin user.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &SqlitePool) -> Result<UserId, Error> {
    let email = Email::parse(email)?;
    let password_hash = password.map(auth::password::hash_password).transpose()?;

    // Use a transaction to ensure atomicity
    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let user_id = {
        let mut user_repo = Users::new(&mut tx);

        match user_repo.get_user_by_email(&email).await? {
            Some(existing) => {
                // User exists - update password if provided
                if password_hash.is_some() {
                    user_repo
                        .update(
                            existing.id,
                            &UserUpdateDBRequest {
                                password_hash,
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                existing.id
            }
            None => {
                user_repo
                    .create(&UserCreateDBRequest {
                        name: "Administrator".to_string(),
                        email,
                        password_hash,
                    })
                    .await?
                    .id
            }
        }
    };

    {
        let mut role_repo = Roles::new(&mut tx);
        let role_id = match role_repo.get_by_name(ADMIN_ROLE).await? {
            Some(role) => role.id,
            None => {
                role_repo
                    .create(&RoleCreateDBRequest {
                        name: ADMIN_ROLE.to_string(),
                    })
                    .await?
                    .id
            }
        };
        role_repo.assign_to_user(user_id, role_id).await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(user_id)
}

/// Seed the store with baseline roles and permissions (run only once).
///
/// The seed is guarded by a "store is empty" check inside the same
/// transaction: if any user or role already exists, nothing is touched, so
/// manual changes survive restarts.
///
/// Baseline content: the Admin, Editor, and Viewer roles; the
/// user-management permissions; Admin granted everything, Editor view+edit,
/// Viewer view only.
#[instrument(skip_all)]
pub async fn seed_database(db: &SqlitePool) -> Result<(), anyhow::Error> {
    let mut tx = db.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT (SELECT COUNT(*) FROM users) + (SELECT COUNT(*) FROM roles)")
        .fetch_one(&mut *tx)
        .await?;

    if existing > 0 {
        info!("Store already contains data, skipping seeding operations");
        return Ok(());
    }

    info!("Seeding empty store with baseline roles and permissions");

    let (admin_id, editor_id, viewer_id) = {
        let mut role_repo = Roles::new(&mut tx);
        let admin = role_repo
            .create(&RoleCreateDBRequest {
                name: ADMIN_ROLE.to_string(),
            })
            .await?;
        let editor = role_repo
            .create(&RoleCreateDBRequest {
                name: "Editor".to_string(),
            })
            .await?;
        let viewer = role_repo
            .create(&RoleCreateDBRequest {
                name: "Viewer".to_string(),
            })
            .await?;
        (admin.id, editor.id, viewer.id)
    };

    let (view_id, create_id, edit_id, delete_id) = {
        let mut permission_repo = Permissions::new(&mut tx);
        let mut ids = Vec::with_capacity(4);
        for name in ["users.view", "users.create", "users.edit", "users.delete"] {
            let permission = permission_repo.create(&PermissionCreateDBRequest { name: name.to_string() }).await?;
            ids.push(permission.id);
        }
        (ids[0], ids[1], ids[2], ids[3])
    };

    {
        let mut role_repo = Roles::new(&mut tx);
        // Admin holds every permission
        for permission_id in [view_id, create_id, edit_id, delete_id] {
            role_repo.grant_permission(admin_id, permission_id).await?;
        }
        // Editor can view and edit users
        role_repo.grant_permission(editor_id, view_id).await?;
        role_repo.grant_permission(editor_id, edit_id).await?;
        // Viewer can only view
        role_repo.grant_permission(viewer_id, view_id).await?;
    }

    tx.commit().await?;

    debug!("Store seeded successfully");

    Ok(())
}

/// Open the database pool and run migrations.
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.database.path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await?;

    migrator().run(&pool).await?;

    Ok(pool)
}

/// Build the application router with all endpoints and middleware.
///
/// - Authentication routes (register, login, me) at the root
/// - Management API (users/roles/permissions CRUD and assignments) under `/api/v1`
/// - Health check at `/healthz`
/// - Tracing middleware over everything
pub fn build_router(state: AppState) -> Router {
    // Authentication routes (at root level)
    let auth_routes = Router::new()
        .route("/auth/register", post(api::handlers::auth::register))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/me", get(api::handlers::auth::me))
        .with_state(state.clone());

    // Management API routes
    let api_routes = Router::new()
        // User management
        .route("/users", get(api::handlers::users::list_users))
        .route("/users", post(api::handlers::users::create_user))
        .route("/users/{id}", get(api::handlers::users::get_user))
        .route("/users/{id}", patch(api::handlers::users::update_user))
        .route("/users/{id}", delete(api::handlers::users::delete_user))
        // User-role relationships
        .route("/users/{user_id}/roles", get(api::handlers::users::get_user_roles))
        .route("/users/{user_id}/roles/{role_id}", post(api::handlers::users::assign_role_to_user))
        .route(
            "/users/{user_id}/roles/{role_id}",
            delete(api::handlers::users::remove_role_from_user),
        )
        // Role management
        .route("/roles", get(api::handlers::roles::list_roles))
        .route("/roles", post(api::handlers::roles::create_role))
        .route("/roles/{id}", get(api::handlers::roles::get_role))
        .route("/roles/{id}", patch(api::handlers::roles::update_role))
        .route("/roles/{id}", delete(api::handlers::roles::delete_role))
        // Role-permission relationships
        .route("/roles/{role_id}/permissions", get(api::handlers::roles::get_role_permissions))
        .route(
            "/roles/{role_id}/permissions/{permission_id}",
            post(api::handlers::roles::grant_permission_to_role),
        )
        .route(
            "/roles/{role_id}/permissions/{permission_id}",
            delete(api::handlers::roles::revoke_permission_from_role),
        )
        // Permission management
        .route("/permissions", get(api::handlers::permissions::list_permissions))
        .route("/permissions", post(api::handlers::permissions::create_permission))
        .route("/permissions/{id}", get(api::handlers::permissions::get_permission))
        .route("/permissions/{id}", patch(api::handlers::permissions::update_permission))
        .route("/permissions/{id}", delete(api::handlers::permissions::delete_permission))
        .with_state(state);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
}

/// The assembled application: bound listener plus router.
pub struct Application {
    router: Router,
    listener: TcpListener,
}

impl Application {
    /// Open the store, run the startup bootstrap (migrations, seed,
    /// initial admin), and bind the listener.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;

        // Seed baseline roles/permissions (only runs on an empty store)
        seed_database(&pool).await?;

        // Ensure the configured admin account exists and holds Admin
        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool).await?;

        let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
        info!("Listening on {}", listener.local_addr()?);

        let state = AppState::builder().db(pool).config(config).build();
        let router = build_router(state);

        Ok(Self { router, listener })
    }

    /// Address the server is bound to (useful with port 0).
    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
