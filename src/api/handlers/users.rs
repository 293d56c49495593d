use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::Pagination,
        roles::{RoleResponse, UserRoleResponse},
        users::{CurrentUser, UserCreate, UserResponse, UserUpdate},
    },
    auth::{password, permissions::require_admin},
    db::handlers::{Repository, Roles, Users, users::UserFilter},
    errors::Error,
    types::{RoleId, UserId},
};

/// List users (any authenticated caller)
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>, Error> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let users = repo.list(&UserFilter::new(skip, limit)).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user (admin only)
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), Error> {
    require_admin(&current_user)?;

    let validated = request.validate()?;
    let password_hash = match request.password {
        Some(plaintext) => Some(
            tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password hashing task: {e}"),
                })??,
        ),
        None => None,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo.create(&validated.into_db_request(password_hash)).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Get a user by ID (any authenticated caller)
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn get_user(State(state): State<AppState>, _current_user: CurrentUser, Path(id): Path<UserId>) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(UserResponse::from(user)))
}

/// Update a user's profile (admin only)
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserResponse>, Error> {
    require_admin(&current_user)?;

    let mut db_request = request.validate()?;
    if let Some(plaintext) = request.password {
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&plaintext))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password hashing task: {e}"),
            })??;
        db_request.password_hash = Some(hash);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let user = repo.update(id, &db_request).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user (admin only); cascades to their role assignments
#[tracing::instrument(skip_all, fields(user_id = %id))]
pub async fn delete_user(State(state): State<AppState>, current_user: CurrentUser, Path(id): Path<UserId>) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    if repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })
    }
}

/// List the roles assigned to a user (any authenticated caller)
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn get_user_roles(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<RoleResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut users = Users::new(&mut conn);
    users.get_by_id(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;

    let mut roles = Roles::new(&mut conn);
    let assigned = roles.roles_for_user(user_id).await?;
    Ok(Json(assigned.into_iter().map(RoleResponse::from).collect()))
}

/// Assign a role to a user (admin only, idempotent)
#[tracing::instrument(skip_all, fields(user_id = %user_id, role_id = %role_id))]
pub async fn assign_role_to_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<Json<UserRoleResponse>, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    let association = repo.assign_to_user(user_id, role_id).await?;
    Ok(Json(UserRoleResponse::from(association)))
}

/// Remove a role from a user (admin only)
#[tracing::instrument(skip_all, fields(user_id = %user_id, role_id = %role_id))]
pub async fn remove_role_from_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Roles::new(&mut conn);

    if repo.remove_from_user(user_id, role_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound {
            resource: "Role assignment".to_string(),
            id: format!("{user_id}/{role_id}"),
        })
    }
}
