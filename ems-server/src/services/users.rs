//! Back-office accounts: login, account management, first-admin bootstrap

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{AdminRole, AdminUser, AdminUserCreate, AdminUserUpdate};

use crate::auth::{AdminIdentity, create_token};
use crate::config::Config;
use crate::db;
use crate::error::{ServiceResult, is_unique_violation};
use crate::security_log;
use crate::state::AppState;
use crate::util::{hash_password, now_millis, snowflake_id, verify_password};
use crate::validation::{
    MAX_EMAIL_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_password,
    validate_required_text,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: AdminRole,
    pub username: String,
}

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Password hash error: {e}");
        AppError::new(ErrorCode::InternalError)
    })
}

/// Usernames are stored and looked up lower-cased
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Verify credentials and issue a JWT. Unknown users and wrong passwords
/// produce the same error.
pub async fn login(state: &AppState, req: LoginRequest) -> ServiceResult<LoginResponse> {
    let username = normalize_username(&req.username);
    let user = db::admin_users::find_by_username(&state.pool, &username).await?;

    let Some(user) = user.filter(|u| verify_password(&req.password, &u.hashed_password)) else {
        security_log!("WARN", "login_failed", username = username);
        return Err(ErrorCode::InvalidCredentials.into());
    };

    if !user.is_active {
        security_log!("WARN", "login_disabled_account", username = user.username.clone());
        return Err(ErrorCode::AccountDisabled.into());
    }

    let token = create_token(user.id, &user.username, user.role, &state.config.jwt_secret)
        .map_err(|e| {
            tracing::error!("JWT creation failed: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;

    db::admin_users::touch_last_login(&state.pool, user.id, now_millis()).await?;
    security_log!(
        "INFO",
        "login_success",
        user_id = user.id,
        username = user.username.clone()
    );

    Ok(LoginResponse {
        token,
        role: user.role,
        username: user.username,
    })
}

fn validate_username(username: &str) -> Result<(), AppError> {
    validate_required_text(username, "username", MAX_SHORT_TEXT_LEN)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(AppError::validation(
            "username may only contain letters, digits, '.', '-' and '_'",
        ));
    }
    Ok(())
}

pub async fn create_user(state: &AppState, data: AdminUserCreate) -> ServiceResult<AdminUser> {
    let username = normalize_username(&data.username);
    validate_username(&username)?;
    validate_password(&data.password)?;
    validate_optional_text(&data.email, "email", MAX_EMAIL_LEN)?;

    let hashed = hash(&data.password)?;
    match db::admin_users::create(
        &state.pool,
        snowflake_id(),
        &username,
        data.email.as_deref(),
        &hashed,
        data.role,
        now_millis(),
    )
    .await
    {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.username, role = user.role.as_str(), "Admin user created");
            Ok(user)
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::new(ErrorCode::UsernameExists)
            .with_detail("username", username)
            .into()),
        Err(e) => Err(e.into()),
    }
}

/// Update an account. Admins cannot deactivate or demote themselves, and the
/// last active admin cannot be removed.
pub async fn update_user(
    state: &AppState,
    actor: &AdminIdentity,
    id: i64,
    data: AdminUserUpdate,
) -> ServiceResult<AdminUser> {
    let target = db::admin_users::find_by_id(&state.pool, id)
        .await?
        .ok_or(ErrorCode::AdminUserNotFound)?;

    let deactivates = data.is_active == Some(false) && target.is_active;
    let demotes = data.role == Some(AdminRole::Staff) && target.role.is_admin();

    if actor.user_id == id && (deactivates || demotes) {
        security_log!("WARN", "self_modification_denied", user_id = actor.user_id);
        return Err(ErrorCode::CannotModifySelf.into());
    }
    if target.role.is_admin()
        && target.is_active
        && (deactivates || demotes)
        && db::admin_users::count_active_admins(&state.pool).await? <= 1
    {
        return Err(AppError::with_message(
            ErrorCode::CannotModifySelf,
            "At least one active admin must remain",
        )
        .into());
    }

    validate_optional_text(&data.email, "email", MAX_EMAIL_LEN)?;
    let hashed = match &data.password {
        Some(password) => {
            validate_password(password)?;
            Some(hash(password)?)
        }
        None => None,
    };

    let user = db::admin_users::update(
        &state.pool,
        id,
        data.email.as_deref(),
        hashed.as_deref(),
        data.role,
        data.is_active,
    )
    .await?
    .ok_or(ErrorCode::AdminUserNotFound)?;

    tracing::info!(
        user_id = id,
        by = actor.user_id,
        password_reset = hashed.is_some(),
        "Admin user updated"
    );
    Ok(user)
}

/// Create the first ADMIN from the bootstrap env vars when no active admin
/// exists yet.
pub async fn bootstrap_admin(state: &AppState, config: &Config) -> ServiceResult<()> {
    let (Some(username), Some(password)) = (
        config.admin_bootstrap_username.as_deref(),
        config.admin_bootstrap_password.as_deref(),
    ) else {
        return Ok(());
    };

    if db::admin_users::count_active_admins(&state.pool).await? > 0 {
        return Ok(());
    }

    let user = create_user(
        state,
        AdminUserCreate {
            username: username.to_string(),
            email: None,
            password: password.to_string(),
            role: AdminRole::Admin,
        },
    )
    .await?;
    tracing::info!(username = %user.username, "Bootstrap admin created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset() {
        assert!(validate_username("door.staff-1").is_ok());
        assert!(validate_username("door staff").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn login_and_create_agree_on_username() {
        // Bootstrap from ADMIN_BOOTSTRAP_USERNAME=Admin, then log in as typed
        assert_eq!(normalize_username("Admin"), normalize_username(" admin "));
        assert_eq!(normalize_username("  Door.Staff-1 "), "door.staff-1");
    }
}
