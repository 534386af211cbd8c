//! Admin-only identity management handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument};

use super::{MessageResponse, parse_optional};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::RequireAdmin;
use crate::user::{
    CreateUserRequest, Division, Region, UpdateUserRequest, UserInfo, UserListQuery, UserRole,
};

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request to create an identity.
#[derive(Debug, Deserialize)]
pub struct AdminCreateUserRequest {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub role: String,
    pub division: Option<String>,
    pub region: Option<String>,
}

/// Request to update an identity. `null` clears division or region.
#[derive(Debug, Default, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub division: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub region: Option<Option<String>>,
}

/// List identities.
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let users = state.users.list_users(query).await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Create an identity, with or without a password.
#[instrument(skip(state, admin, request))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<AdminCreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let role: UserRole = request.role.parse().map_err(ApiError::bad_request)?;

    let user = state
        .users
        .create_user(CreateUserRequest {
            email: request.email,
            name: request.name,
            password: request.password.filter(|p| !p.is_empty()),
            role,
            division: parse_optional::<Division>(request.division.as_deref())?,
            region: parse_optional::<Region>(request.region.as_deref())?,
        })
        .await?;

    info!(admin_id = %admin.id(), user_id = %user.id, "Admin created user");
    Ok((StatusCode::CREATED, Json(UserInfo::from(user))))
}

/// Update name, password, role, division or region.
#[instrument(skip(state, admin, request))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> ApiResult<Json<UserInfo>> {
    let role = parse_optional::<UserRole>(request.role.as_deref())?;

    let division = match request.division {
        None => None,
        Some(value) => Some(parse_optional::<Division>(value.as_deref())?),
    };
    let region = match request.region {
        None => None,
        Some(value) => Some(parse_optional::<Region>(value.as_deref())?),
    };

    let user = state
        .users
        .update_user(
            &user_id,
            UpdateUserRequest {
                name: request.name,
                password: request.password,
                role,
                division,
                region,
            },
        )
        .await?;

    info!(admin_id = %admin.id(), user_id = %user.id, "Admin updated user");
    Ok(Json(user.into()))
}

/// Delete an identity and all of its sessions.
#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if admin.id() == user_id {
        return Err(ApiError::bad_request("cannot delete your own account"));
    }

    state.users.delete_user(&user_id).await?;
    let revoked = state.sessions().revoke_all_for_user(&user_id).await?;

    info!(admin_id = %admin.id(), user_id = %user_id, revoked, "Admin deleted user");
    Ok(MessageResponse::new("User deleted"))
}
