use super::{JsonBody, PathParam};
use crate::auth::{hash_password, AdminUser};
use crate::domain::{User, UserInput};
use crate::error::CmsError;
use crate::metrics::CmsMetrics;
use crate::server::response::{created, done, ok, ok_with_message, ApiError, ApiResponse, ApiResult};
use crate::server::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

pub async fn list_users(
    State(state): State<AppState>,
    user: AdminUser,
) -> ApiResult<Json<ApiResponse<Vec<User>>>> {
    user.require_admin_role()?;
    Ok(ok(state.db.list_users()?))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ApiResponse<User>>> {
    user.require_admin_role()?;
    let found = state.db.get_user(id)?.ok_or_else(|| CmsError::not_found("User"))?;
    Ok(ok(found))
}

pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    JsonBody(input): JsonBody<UserInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<User>>)> {
    admin.require_admin_role()?;
    let (mut user, password) = input.into_user()?;
    user.password_hash = hash_password(&password)?;
    state.db.create_user(&mut user)?;
    CmsMetrics::record_write("users", "create");
    info!("User {} created by {}", user.email, admin.0.email);
    Ok(created(user, "User created"))
}

pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    PathParam(id): PathParam<i64>,
    JsonBody(input): JsonBody<UserInput>,
) -> ApiResult<Json<ApiResponse<User>>> {
    admin.require_admin_role()?;
    let mut user = state.db.get_user(id)?.ok_or_else(|| CmsError::not_found("User"))?;
    if let Some(password) = input.apply_to(&mut user)? {
        user.password_hash = hash_password(&password)?;
    }
    if user.id == admin.0.id && !user.is_active {
        return Err(ApiError::BadRequest("You cannot deactivate your own account".to_string()));
    }
    state.db.update_user(&user)?;
    CmsMetrics::record_write("users", "update");
    Ok(ok_with_message(user, "User updated"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Value>> {
    admin.require_admin_role()?;
    if id == admin.0.id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }
    state.db.delete_user(id)?;
    CmsMetrics::record_write("users", "delete");
    Ok(done("User deleted"))
}
