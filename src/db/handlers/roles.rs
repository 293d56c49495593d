//! Database repository for roles, role assignment, and permission grants.
//!
//! The role table is the hub of the RBAC graph: this repository owns both
//! join relations (user_roles and role_permissions). Join mutations are
//! single statements whose existence and uniqueness checks are enforced by
//! the store's composite primary keys and foreign keys, so a concurrent
//! duplicate assignment is rejected at the store rather than producing a
//! second row.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::{
        permissions::PermissionDBResponse,
        roles::{RoleCreateDBRequest, RoleDBResponse, RolePermissionDBResponse, RoleUpdateDBRequest, UserRoleDBResponse},
    },
};
use crate::types::{PermissionId, RoleId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing roles
#[derive(Debug, Clone)]
pub struct RoleFilter {
    pub skip: i64,
    pub limit: i64,
}

impl RoleFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Role {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

pub struct Roles<'c> {
    db: &'c mut SqliteConnection,
}

impl From<Role> for RoleDBResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            created_at: role.created_at,
        }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Roles<'c> {
    type CreateRequest = RoleCreateDBRequest;
    type UpdateRequest = RoleUpdateDBRequest;
    type Response = RoleDBResponse;
    type Id = RoleId;
    type Filter = RoleFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (id, name, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(RoleDBResponse::from(role))
    }

    #[instrument(skip(self), fields(role_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(role.map(RoleDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(roles.into_iter().map(RoleDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(role_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // user_roles and role_permissions rows go with the role via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM roles WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(role_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles SET name = COALESCE(?, name)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.name.as_ref())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(RoleDBResponse::from(role))
    }
}

impl<'c> Roles<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<RoleDBResponse>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(role.map(RoleDBResponse::from))
    }

    // User-role assignment

    /// Assign a role to a user.
    ///
    /// Idempotent: an existing (user, role) pair is left untouched and
    /// returned as-is. A missing user or role surfaces as [`DbError::NotFound`].
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), role_id = %abbrev_uuid(&role_id)), err)]
    pub async fn assign_to_user(&mut self, user_id: UserId, role_id: RoleId) -> Result<UserRoleDBResponse> {
        match sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(UserRoleDBResponse { user_id, role_id }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Foreign key violation means either user or role doesn't exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Remove a role from a user. Returns false when no such association existed.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), role_id = %abbrev_uuid(&role_id)), err)]
    pub async fn remove_from_user(&mut self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All roles currently linked to a user. Order is not significant.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn roles_for_user(&mut self, user_id: UserId) -> Result<Vec<RoleDBResponse>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            INNER JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = ?
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(roles.into_iter().map(RoleDBResponse::from).collect())
    }

    // Role-permission grants

    /// Grant a permission to a role, with the same idempotency and
    /// not-found semantics as [`Self::assign_to_user`].
    #[instrument(skip(self), fields(role_id = %abbrev_uuid(&role_id), permission_id = %abbrev_uuid(&permission_id)), err)]
    pub async fn grant_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> Result<RolePermissionDBResponse> {
        match sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *self.db)
            .await
        {
            Ok(_) => Ok(RolePermissionDBResponse { role_id, permission_id }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Revoke a permission from a role. Returns false when no grant existed.
    #[instrument(skip(self), fields(role_id = %abbrev_uuid(&role_id), permission_id = %abbrev_uuid(&permission_id)), err)]
    pub async fn revoke_permission(&mut self, role_id: RoleId, permission_id: PermissionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All permissions currently granted to a role.
    #[instrument(skip(self), fields(role_id = %abbrev_uuid(&role_id)), err)]
    pub async fn permissions_for_role(&mut self, role_id: RoleId) -> Result<Vec<PermissionDBResponse>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            INNER JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id = ?
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(permissions
            .into_iter()
            .map(|p| PermissionDBResponse {
                id: p.id,
                name: p.name,
                created_at: p.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use crate::db::handlers::{Permissions, Users};
    use crate::db::models::{permissions::PermissionCreateDBRequest, users::UserCreateDBRequest};
    use crate::types::Email;
    use sqlx::SqlitePool;

    async fn create_user(conn: &mut SqliteConnection, email: &str) -> UserId {
        let mut repo = Users::new(conn);
        repo.create(&UserCreateDBRequest {
            name: "Test User".to_string(),
            email: Email::parse(email).unwrap(),
            password_hash: None,
        })
        .await
        .unwrap()
        .id
    }

    async fn create_role(conn: &mut SqliteConnection, name: &str) -> RoleId {
        let mut repo = Roles::new(conn);
        repo.create(&RoleCreateDBRequest { name: name.to_string() }).await.unwrap().id
    }

    async fn create_permission(conn: &mut SqliteConnection, name: &str) -> PermissionId {
        let mut repo = Permissions::new(conn);
        repo.create(&PermissionCreateDBRequest { name: name.to_string() }).await.unwrap().id
    }

    async fn count_user_roles(pool: &SqlitePool, user_id: UserId, role_id: RoleId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user_id)
            .bind(role_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test_log::test(sqlx::test)]
    async fn test_assign_role_is_idempotent(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "assignee@example.com").await;
        let role_id = create_role(&mut conn, "Editor").await;

        let mut repo = Roles::new(&mut conn);
        let first = repo.assign_to_user(user_id, role_id).await.unwrap();
        let second = repo.assign_to_user(user_id, role_id).await.unwrap();
        assert_eq!(first, second);

        drop(conn);
        assert_eq!(count_user_roles(&pool, user_id, role_id).await, 1);
    }

    #[sqlx::test]
    async fn test_assign_role_missing_parents(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "real@example.com").await;
        let role_id = create_role(&mut conn, "Viewer").await;

        let mut repo = Roles::new(&mut conn);

        let err = repo.assign_to_user(Uuid::new_v4(), role_id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));

        let err = repo.assign_to_user(user_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    async fn test_remove_role(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "remove@example.com").await;
        let role_id = create_role(&mut conn, "Editor").await;

        let mut repo = Roles::new(&mut conn);

        // Removing an association that doesn't exist reports false and changes nothing
        assert!(!repo.remove_from_user(user_id, role_id).await.unwrap());
        assert!(repo.roles_for_user(user_id).await.unwrap().is_empty());

        repo.assign_to_user(user_id, role_id).await.unwrap();
        assert!(repo.remove_from_user(user_id, role_id).await.unwrap());
        assert!(repo.roles_for_user(user_id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_roles_for_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "roles@example.com").await;
        let admin = create_role(&mut conn, "Admin").await;
        let editor = create_role(&mut conn, "Editor").await;
        // An unassigned role must not show up
        create_role(&mut conn, "Viewer").await;

        let mut repo = Roles::new(&mut conn);
        repo.assign_to_user(user_id, admin).await.unwrap();
        repo.assign_to_user(user_id, editor).await.unwrap();

        let names: Vec<String> = repo.roles_for_user(user_id).await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Admin".to_string(), "Editor".to_string()]);
    }

    #[sqlx::test]
    async fn test_permission_grants(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let role_id = create_role(&mut conn, "Editor").await;
        let view = create_permission(&mut conn, "users.view").await;
        let edit = create_permission(&mut conn, "users.edit").await;

        let mut repo = Roles::new(&mut conn);
        repo.grant_permission(role_id, view).await.unwrap();
        repo.grant_permission(role_id, edit).await.unwrap();
        // Granting twice leaves a single row
        repo.grant_permission(role_id, view).await.unwrap();

        let names: Vec<String> = repo.permissions_for_role(role_id).await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["users.edit".to_string(), "users.view".to_string()]);

        assert!(repo.revoke_permission(role_id, view).await.unwrap());
        assert!(!repo.revoke_permission(role_id, view).await.unwrap());

        let err = repo.grant_permission(Uuid::new_v4(), edit).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[test_log::test(sqlx::test)]
    async fn test_delete_role_cascades(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "cascade@example.com").await;
        let role_id = create_role(&mut conn, "Doomed").await;
        let keep_role = create_role(&mut conn, "Kept").await;
        let perm = create_permission(&mut conn, "users.view").await;

        let mut repo = Roles::new(&mut conn);
        repo.assign_to_user(user_id, role_id).await.unwrap();
        repo.assign_to_user(user_id, keep_role).await.unwrap();
        repo.grant_permission(role_id, perm).await.unwrap();

        assert!(repo.delete(role_id).await.unwrap());

        // The user keeps unrelated roles, the deleted role is gone everywhere
        let names: Vec<String> = repo.roles_for_user(user_id).await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Kept".to_string()]);
        assert!(repo.get_by_id(role_id).await.unwrap().is_none());
        assert!(repo.permissions_for_role(role_id).await.unwrap().is_empty());

        // The permission itself survives the role deletion
        drop(conn);
        let mut conn = pool.acquire().await.unwrap();
        let mut perms = Permissions::new(&mut conn);
        assert!(perms.get_by_id(perm).await.unwrap().is_some());
    }

    #[sqlx::test]
    async fn test_delete_user_cascades_assignments(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = create_user(&mut conn, "gone@example.com").await;
        let role_id = create_role(&mut conn, "Editor").await;

        let mut roles = Roles::new(&mut conn);
        roles.assign_to_user(user_id, role_id).await.unwrap();
        drop(conn);

        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        assert!(users.delete(user_id).await.unwrap());
        drop(conn);

        assert_eq!(count_user_roles(&pool, user_id, role_id).await, 0);
    }

    #[sqlx::test]
    async fn test_get_by_name(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let role_id = create_role(&mut conn, "Admin").await;

        let mut repo = Roles::new(&mut conn);
        let found = repo.get_by_name("Admin").await.unwrap().expect("role should exist");
        assert_eq!(found.id, role_id);
        assert!(repo.get_by_name("Nonexistent").await.unwrap().is_none());
    }
}
