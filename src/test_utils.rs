//! Test utilities for integration testing (available with `test-utils` feature).

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::token::create_access_token;
use crate::config::Config;
use crate::db::handlers::{Permissions, Repository, Roles, Users};
use crate::db::models::{
    permissions::{PermissionCreateDBRequest, PermissionDBResponse},
    roles::{RoleCreateDBRequest, RoleDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{Email, RoleId, UserId};

pub fn create_test_config() -> Config {
    Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    }
}

/// Create a user with a unique email and the given roles (created on
/// demand if they don't exist yet).
pub async fn create_test_user(pool: &SqlitePool, roles: &[&str]) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("testuser_{suffix}@example.com");

    let user = {
        let mut users_repo = Users::new(&mut conn);
        users_repo
            .create(&UserCreateDBRequest {
                name: "Test User".to_string(),
                email: Email::parse(&email).expect("test email is valid"),
                password_hash: None,
            })
            .await
            .expect("Failed to create test user")
    };

    for role in roles {
        let role_id = ensure_role(&mut conn, role).await;
        let mut roles_repo = Roles::new(&mut conn);
        roles_repo
            .assign_to_user(user.id, role_id)
            .await
            .expect("Failed to assign role to test user");
    }

    user
}

/// Create a role by name, reusing it when it already exists.
pub async fn create_test_role(pool: &SqlitePool, name: &str) -> RoleDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut roles_repo = Roles::new(&mut conn);
    if let Some(existing) = roles_repo.get_by_name(name).await.expect("Failed to look up role") {
        return existing;
    }
    roles_repo
        .create(&RoleCreateDBRequest { name: name.to_string() })
        .await
        .expect("Failed to create test role")
}

pub async fn create_test_permission(pool: &SqlitePool, name: &str) -> PermissionDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut permissions_repo = Permissions::new(&mut conn);
    permissions_repo
        .create(&PermissionCreateDBRequest { name: name.to_string() })
        .await
        .expect("Failed to create test permission")
}

/// Assign a role (created on demand) to a user directly through the store.
pub async fn assign_role_by_name(pool: &SqlitePool, user_id: UserId, role: &str) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let role_id = ensure_role(&mut conn, role).await;
    let mut roles_repo = Roles::new(&mut conn);
    roles_repo.assign_to_user(user_id, role_id).await.expect("Failed to assign role");
}

/// Sign a bearer token for a user with an explicit role-claim snapshot,
/// bypassing the login flow.
pub fn bearer_for(user: &UserDBResponse, roles: &[&str], config: &Config) -> String {
    let role_names = roles.iter().map(|r| r.to_string()).collect();
    create_access_token(user, role_names, config).expect("Failed to sign test token")
}

async fn ensure_role(conn: &mut sqlx::SqliteConnection, name: &str) -> RoleId {
    let mut roles_repo = Roles::new(conn);
    if let Some(existing) = roles_repo.get_by_name(name).await.expect("Failed to look up role") {
        existing.id
    } else {
        roles_repo
            .create(&RoleCreateDBRequest { name: name.to_string() })
            .await
            .expect("Failed to create role")
            .id
    }
}
