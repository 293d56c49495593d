//! Database repository for permissions.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::permissions::{PermissionCreateDBRequest, PermissionDBResponse, PermissionUpdateDBRequest},
};
use crate::types::{PermissionId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing permissions
#[derive(Debug, Clone)]
pub struct PermissionFilter {
    pub skip: i64,
    pub limit: i64,
}

impl PermissionFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

pub struct Permissions<'c> {
    db: &'c mut SqliteConnection,
}

impl From<Permission> for PermissionDBResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            created_at: permission.created_at,
        }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Permissions<'c> {
    type CreateRequest = PermissionCreateDBRequest;
    type UpdateRequest = PermissionUpdateDBRequest;
    type Response = PermissionDBResponse;
    type Id = PermissionId;
    type Filter = PermissionFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (id, name, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(PermissionDBResponse::from(permission))
    }

    #[instrument(skip(self), fields(permission_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(permission.map(PermissionDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY name LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(permissions.into_iter().map(PermissionDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(permission_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        // role_permissions rows go with the permission via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM permissions WHERE id = ?").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(permission_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let permission = sqlx::query_as::<_, Permission>(
            r#"
            UPDATE permissions SET name = COALESCE(?, name)
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(request.name.as_ref())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(PermissionDBResponse::from(permission))
    }
}

impl<'c> Permissions<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<PermissionDBResponse>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(permission.map(PermissionDBResponse::from))
    }
}
