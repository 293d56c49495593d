use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::Pagination,
        permissions::{PermissionCreate, PermissionResponse, PermissionUpdate},
        users::CurrentUser,
    },
    auth::permissions::require_admin,
    db::handlers::{Permissions, Repository, permissions::PermissionFilter},
    errors::Error,
    types::PermissionId,
};

/// List permissions (any authenticated caller)
#[tracing::instrument(skip_all)]
pub async fn list_permissions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<PermissionResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Permissions::new(&mut conn);

    let permissions = repo.list(&PermissionFilter::new(skip, limit)).await?;
    Ok(Json(permissions.into_iter().map(PermissionResponse::from).collect()))
}

/// Create a permission (admin only)
#[tracing::instrument(skip_all)]
pub async fn create_permission(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PermissionCreate>,
) -> Result<(StatusCode, Json<PermissionResponse>), Error> {
    require_admin(&current_user)?;

    let db_request = request.validate()?;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Permissions::new(&mut conn);

    let permission = repo.create(&db_request).await?;
    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

/// Get a permission by ID (any authenticated caller)
#[tracing::instrument(skip_all, fields(permission_id = %id))]
pub async fn get_permission(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<PermissionId>,
) -> Result<Json<PermissionResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Permissions::new(&mut conn);

    let permission = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Permission".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// Rename a permission (admin only)
#[tracing::instrument(skip_all, fields(permission_id = %id))]
pub async fn update_permission(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<PermissionId>,
    Json(request): Json<PermissionUpdate>,
) -> Result<Json<PermissionResponse>, Error> {
    require_admin(&current_user)?;

    let db_request = request.validate()?;
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Permissions::new(&mut conn);

    let permission = repo.update(id, &db_request).await?;
    Ok(Json(PermissionResponse::from(permission)))
}

/// Delete a permission (admin only); cascades to role grants
#[tracing::instrument(skip_all, fields(permission_id = %id))]
pub async fn delete_permission(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<PermissionId>,
) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Permissions::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Permission".to_string(),
            id: id.to_string(),
        })
    }
}
