//! Axum route handlers for registration, login and account self-service.

use axum::{extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{digest_reset_token, new_reset_token};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::user::{NewUser, User, UserPatch};
use crate::response::{created, ok, ok_with_message, JsonResponse};
use crate::state::AppState;
use crate::validation::{check, lenient, ApiJson};

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, JsonResponse<AuthResponse>), AppError> {
    check(&req)?;

    let email = normalize_email(&req.email);
    if state.store.user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(crate::store::DUPLICATE_EMAIL.to_string()));
    }

    let password_hash = hash_password(&req.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email,
            password_hash,
            name: req.name,
        })
        .await?;

    let token = state.jwt.issue(user.id, &user.email)?;
    info!("Registered user {}", user.id);

    Ok(created(AuthResponse { user, token }))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<JsonResponse<AuthResponse>, AppError> {
    check(&req)?;

    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store
        .user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash).await? {
        return Err(invalid());
    }

    let token = state.jwt.issue(user.id, &user.email)?;
    Ok(ok(AuthResponse { user, token }))
}

/// POST /api/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<JsonResponse<Value>, AppError> {
    if let Some(provider) = &state.auth_provider {
        provider.sign_out(&auth.token).await;
    }
    Ok(ok_with_message(json!({}), "Logged out successfully"))
}

/// GET /api/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<JsonResponse<User>, AppError> {
    let user = state
        .store
        .user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(ok(user))
}

/// PATCH /api/auth/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> Result<JsonResponse<User>, AppError> {
    check(&req)?;

    let user = state
        .store
        .update_user(
            auth.id,
            UserPatch {
                name: req.name,
                avatar: req.avatar,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(ok(user))
}

/// PATCH /api/auth/change-password
pub async fn handle_change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<JsonResponse<Value>, AppError> {
    check(&req)?;

    let user = state
        .store
        .user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !verify_password(&req.current_password, &user.password_hash).await? {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(&req.new_password).await?;
    state.store.set_password(user.id, &password_hash).await?;
    info!("Password changed for user {}", user.id);

    Ok(ok_with_message(json!({}), "Password changed successfully"))
}

/// POST /api/auth/forgot-password
///
/// Responds identically whether or not the email is registered. A failed send is
/// logged and its token cleared rather than reported.
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<JsonResponse<Value>, AppError> {
    check(&req)?;

    if !state.mailer.is_configured() {
        return Err(AppError::UpstreamUnavailable(
            "Email provider is not configured".to_string(),
        ));
    }

    if let Some(user) = state.store.user_by_email(&normalize_email(&req.email)).await? {
        let (token, digest) = new_reset_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        state
            .store
            .set_reset_token(user.id, Some(&digest), Some(expires))
            .await?;

        let link = format!(
            "{}/reset-password?token={token}",
            state.config.frontend_url.trim_end_matches('/')
        );
        match state.mailer.send_password_reset(&user.email, &link).await {
            Ok(()) => info!("Password reset requested for user {}", user.id),
            Err(e) => {
                warn!("Password reset email for user {} was not sent: {e}", user.id);
                state.store.set_reset_token(user.id, None, None).await?;
            }
        }
    }

    Ok(ok_with_message(json!({}), FORGOT_PASSWORD_MESSAGE))
}

/// POST /api/auth/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<JsonResponse<Value>, AppError> {
    check(&req)?;

    let user = state
        .store
        .user_by_reset_token(&digest_reset_token(req.token.trim()))
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired reset token".to_string()))?;

    let password_hash = hash_password(&req.password).await?;
    state.store.set_password(user.id, &password_hash).await?;
    info!("Password reset completed for user {}", user.id);

    Ok(ok_with_message(json!({}), "Password has been reset"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::messages_for;

    #[test]
    fn test_register_rules() {
        let req = RegisterRequest {
            email: "bad".into(),
            password: "123".into(),
            name: Some("A".into()),
        };
        let messages = messages_for(&req);
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn test_register_name_optional() {
        let req = RegisterRequest {
            email: "jane@example.com".into(),
            password: "secret1".into(),
            name: None,
        };
        assert!(check(&req).is_ok());
    }

    #[test]
    fn test_login_only_checks_presence() {
        let req = LoginRequest {
            email: "not-an-email".into(),
            password: "x".into(),
        };
        assert!(check(&req).is_ok());
        let empty = LoginRequest {
            email: String::new(),
            password: String::new(),
        };
        assert_eq!(messages_for(&empty).len(), 2);
    }

    #[test]
    fn test_blank_name_rejected_after_trim() {
        let req: RegisterRequest = serde_json::from_value(json!({
            "email": "jane@example.com",
            "password": "secret1",
            "name": "    "
        }))
        .unwrap();
        assert_eq!(
            messages_for(&req),
            vec!["Name must be between 2 and 50 characters".to_string()]
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
