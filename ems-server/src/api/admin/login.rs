use axum::Json;
use axum::extract::State;

use crate::api::ApiResult;
use crate::services::users::{self, LoginRequest, LoginResponse};
use crate::state::AppState;

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    Ok(Json(users::login(&state, req).await?))
}
