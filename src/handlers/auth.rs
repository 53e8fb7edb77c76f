// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header},
};
use timesheet_portal_api::{
    AccountResponse, LoginRequest, LoginResponse, PasswordResetConfirmRequest,
    PasswordResetRequest, RegisterRequest,
};

use crate::app::AppState;
use crate::auth::extractors::ClientIp;
use crate::auth::services::{Denial, LoginOutcome};
use crate::error::AppError;
use crate::response::AppResponse;

/// POST /auth/register
/// Inscription d'un nouvel account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<AppResponse<AccountResponse>, AppError> {
    let Json(payload) = payload?;
    let account = state.auth.register(payload)?;
    Ok(AppResponse::created(AccountResponse::from(account)))
}

/// POST /auth/login
/// Connexion par email ou nom d'utilisateur
pub async fn login(
    State(state): State<AppState>,
    ClientIp(source_ip): ClientIp,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AppResponse<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok());

    let outcome =
        state
            .auth
            .authenticate(&payload.identifier, &payload.password, &source_ip, user_agent)?;

    match outcome {
        LoginOutcome::Granted(issued) => {
            let mut no_store = HeaderMap::new();
            no_store.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

            let response = LoginResponse {
                token: issued.token,
                token_type: "Bearer".to_string(),
                expires_at: issued.expires_at,
                expires_in: state.auth.jwt_manager().expiration().num_seconds(),
            };
            Ok(AppResponse::ok(response).with_headers(no_store))
        }
        LoginOutcome::Denied(Denial::InvalidCredentials) => Err(AppError::InvalidCredentials),
        LoginOutcome::Denied(Denial::Locked {
            until,
            retry_after_secs,
        }) => Err(AppError::AccountLocked {
            until,
            retry_after_secs,
        }),
    }
}

/// POST /auth/password-reset/request
/// Même réponse que l'email existe ou non
pub async fn request_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<AppResponse<serde_json::Value>, AppError> {
    let Json(payload) = payload?;
    state.auth.request_password_reset(&payload.email)?;
    Ok(AppResponse::accepted(serde_json::json!({
        "message": "If an account uses this email, a reset link has been sent"
    })))
}

/// POST /auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetConfirmRequest>, JsonRejection>,
) -> Result<AppResponse<serde_json::Value>, AppError> {
    let Json(payload) = payload?;
    state.auth.reset_password(&payload)?;
    Ok(AppResponse::ok(
        serde_json::json!({ "message": "Password has been reset" }),
    ))
}
