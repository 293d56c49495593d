use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::Pagination,
        permissions::PermissionResponse,
        roles::{RoleCreate, RolePermissionResponse, RoleResponse, RoleUpdate},
        users::CurrentUser,
    },
    auth::permissions::require_admin,
    db::handlers::{Repository, Roles, roles::RoleFilter},
    errors::Error,
    types::{PermissionId, RoleId},
};

/// List roles (any authenticated caller)
#[tracing::instrument(skip_all)]
pub async fn list_roles(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<RoleResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let roles = repo.list(&RoleFilter::new(skip, limit)).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// Create a role (admin only)
#[tracing::instrument(skip_all)]
pub async fn create_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<RoleCreate>,
) -> Result<(StatusCode, Json<RoleResponse>), Error> {
    require_admin(&current_user)?;

    let db_request = request.validate()?;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let role = repo.create(&db_request).await?;
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

/// Get a role by ID (any authenticated caller)
#[tracing::instrument(skip_all, fields(role_id = %id))]
pub async fn get_role(State(state): State<AppState>, _current_user: CurrentUser, Path(id): Path<RoleId>) -> Result<Json<RoleResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let role = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Role".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(RoleResponse::from(role)))
}

/// Rename a role (admin only)
#[tracing::instrument(skip_all, fields(role_id = %id))]
pub async fn update_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<RoleId>,
    Json(request): Json<RoleUpdate>,
) -> Result<Json<RoleResponse>, Error> {
    require_admin(&current_user)?;

    let db_request = request.validate()?;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let role = repo.update(id, &db_request).await?;
    Ok(Json(RoleResponse::from(role)))
}

/// Delete a role (admin only); cascades to assignments and grants
#[tracing::instrument(skip_all, fields(role_id = %id))]
pub async fn delete_role(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<RoleId>) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Role".to_string(),
            id: id.to_string(),
        })
    }
}

/// List the permissions granted to a role (any authenticated caller)
#[tracing::instrument(skip_all, fields(role_id = %role_id))]
pub async fn get_role_permissions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(role_id): Path<RoleId>,
) -> Result<Json<Vec<PermissionResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    repo.get_by_id(role_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Role".to_string(),
        id: role_id.to_string(),
    })?;

    let granted = repo.permissions_for_role(role_id).await?;
    Ok(Json(granted.into_iter().map(PermissionResponse::from).collect()))
}

/// Grant a permission to a role (admin only, idempotent)
#[tracing::instrument(skip_all, fields(role_id = %role_id, permission_id = %permission_id))]
pub async fn grant_permission_to_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<Json<RolePermissionResponse>, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let association = repo.grant_permission(role_id, permission_id).await?;
    Ok(Json(RolePermissionResponse::from(association)))
}

/// Revoke a permission from a role (admin only)
#[tracing::instrument(skip_all, fields(role_id = %role_id, permission_id = %permission_id))]
pub async fn revoke_permission_from_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    if repo.revoke_permission(role_id, permission_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Permission grant".to_string(),
            id: format!("{role_id}/{permission_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_utils::{bearer_for, create_test_config, create_test_permission, create_test_user};
    use axum_test::TestServer;
    use sqlx::SqlitePool;

    fn test_server(pool: SqlitePool) -> (TestServer, crate::config::Config) {
        let config = create_test_config();
        let state = AppState::builder().db(pool).config(config.clone()).build();
        (TestServer::new(build_router(state)).unwrap(), config)
    }

    #[sqlx::test]
    async fn test_role_crud_and_validation(pool: SqlitePool) {
        let (server, config) = test_server(pool.clone());
        let admin = create_test_user(&pool, &["Admin"]).await;
        let token = bearer_for(&admin, &["Admin"], &config);

        // Too-short name is rejected with a structured error
        let response = server
            .post("/api/v1/roles")
            .authorization_bearer(&token)
            .json(&RoleCreate { name: "ab".to_string() })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/v1/roles")
            .authorization_bearer(&token)
            .json(&RoleCreate {
                name: "Moderator".to_string(),
            })
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: RoleResponse = response.json();

        let response = server
            .patch(&format!("/api/v1/roles/{}", created.id))
            .authorization_bearer(&token)
            .json(&RoleUpdate {
                name: Some("Lead Moderator".to_string()),
            })
            .await;
        response.assert_status(StatusCode::OK);
        let updated: RoleResponse = response.json();
        assert_eq!(updated.name, "Lead Moderator");

        let response = server.delete(&format!("/api/v1/roles/{}", created.id)).authorization_bearer(&token).await;
        response.assert_status(StatusCode::NO_CONTENT);
        let response = server.get(&format!("/api/v1/roles/{}", created.id)).authorization_bearer(&token).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_permission_grant_flow(pool: SqlitePool) {
        let (server, config) = test_server(pool.clone());
        let admin = create_test_user(&pool, &["Admin"]).await;
        let token = bearer_for(&admin, &["Admin"], &config);

        let role: RoleResponse = server
            .post("/api/v1/roles")
            .authorization_bearer(&token)
            .json(&RoleCreate { name: "Auditor".to_string() })
            .await
            .json();
        let permission = create_test_permission(&pool, "reports.view").await;

        let url = format!("/api/v1/roles/{}/permissions/{}", role.id, permission.id);
        server.post(&url).authorization_bearer(&token).await.assert_status(StatusCode::OK);

        let granted: Vec<PermissionResponse> = server
            .get(&format!("/api/v1/roles/{}/permissions", role.id))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].name, "reports.view");

        server.delete(&url).authorization_bearer(&token).await.assert_status(StatusCode::NO_CONTENT);
        server.delete(&url).authorization_bearer(&token).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_deleted_role_permissions_are_gone(pool: SqlitePool) {
        let (server, config) = test_server(pool.clone());
        let admin = create_test_user(&pool, &["Admin"]).await;
        let token = bearer_for(&admin, &["Admin"], &config);

        let role: RoleResponse = server
            .post("/api/v1/roles")
            .authorization_bearer(&token)
            .json(&RoleCreate { name: "Ephemeral".to_string() })
            .await
            .json();
        let permission = create_test_permission(&pool, "things.do").await;

        server
            .post(&format!("/api/v1/roles/{}/permissions/{}", role.id, permission.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);

        server
            .delete(&format!("/api/v1/roles/{}", role.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        // The role is gone, so its permission listing is a 404 rather than an empty set
        let response = server
            .get(&format!("/api/v1/roles/{}/permissions", role.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_role_mutations_are_admin_gated(pool: SqlitePool) {
        let (server, config) = test_server(pool.clone());
        let user = create_test_user(&pool, &["Editor"]).await;
        let token = bearer_for(&user, &["Editor"], &config);

        let response = server
            .post("/api/v1/roles")
            .authorization_bearer(&token)
            .json(&RoleCreate { name: "Sneaky".to_string() })
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        // Reads are fine with any valid token
        server.get("/api/v1/roles").authorization_bearer(&token).await.assert_status(StatusCode::OK);
    }
}
