//! Back-office accounts

use axum::extract::{Path, State};
use axum::{Extension, Json};
use shared::models::{AdminUser, AdminUserCreate, AdminUserUpdate};

use crate::api::ApiResult;
use crate::auth::AdminIdentity;
use crate::db;
use crate::services::users;
use crate::state::AppState;

/// GET /api/admin/users
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<AdminUser>> {
    Ok(Json(db::admin_users::list(&state.pool).await?))
}

/// POST /api/admin/users
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(data): Json<AdminUserCreate>,
) -> ApiResult<AdminUser> {
    let user = users::create_user(&state, data).await?;
    tracing::info!(user_id = user.id, by = identity.user_id, "Account created from back office");
    Ok(Json(user))
}

/// PUT /api/admin/users/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<i64>,
    Json(data): Json<AdminUserUpdate>,
) -> ApiResult<AdminUser> {
    Ok(Json(users::update_user(&state, &identity, id, data).await?))
}
