//! Authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::errors::ErrorKind;
use shared::error::{AppError, ErrorCode};
use shared::models::AdminUser;

use super::jwt::{AdminIdentity, verify_token};
use crate::db;
use crate::security_log;
use crate::state::AppState;

/// Require a valid admin/staff JWT for an account that is still active.
///
/// Extracts `Authorization: Bearer <token>`, verifies it, reloads the account
/// and inserts [`AdminIdentity`] into the request extensions. The role comes
/// from the account, not the token, so demotions apply immediately.
///
/// | Failure | Code |
/// |---------|------|
/// | no header | `NotAuthenticated` (401) |
/// | expired | `TokenExpired` (401) |
/// | bad signature / malformed / account deleted | `TokenInvalid` (401) |
/// | account deactivated | `AccountDisabled` (401) |
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = request.uri().to_string());
            return Err(AppError::not_authenticated());
        }
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = e.to_string(),
                uri = request.uri().to_string()
            );
            return Err(match e.kind() {
                ErrorKind::ExpiredSignature => AppError::token_expired(),
                _ => AppError::invalid_token("Invalid token"),
            });
        }
    };

    let claimed = AdminIdentity::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {e}")))?;

    let account = db::admin_users::find_by_id(&state.pool, claimed.user_id).await?;
    let identity = current_identity(&claimed, account.as_ref()).inspect_err(|e| {
        security_log!(
            "WARN",
            "auth_stale_account",
            user_id = claimed.user_id,
            code = e.code.code(),
            uri = request.uri().to_string()
        );
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Identity for a token holder as the account stands now.
pub fn current_identity(
    claimed: &AdminIdentity,
    account: Option<&AdminUser>,
) -> Result<AdminIdentity, AppError> {
    let Some(account) = account else {
        return Err(AppError::invalid_token("Account no longer exists"));
    };
    if !account.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }
    Ok(AdminIdentity {
        user_id: account.id,
        username: account.username.clone(),
        role: account.role,
    })
}

/// Require the ADMIN role. Must run after [`admin_auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<AdminIdentity>()
        .ok_or_else(AppError::not_authenticated)?;

    if !identity.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = identity.user_id,
            username = identity.username.clone(),
            uri = request.uri().to_string()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(request).await)
}
