use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use timesheet_portal_api::{AccountResponse, ChangePasswordRequest, LoginAttemptResponse};

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /users/me
pub async fn me(
    State(state): State<AppState>,
    claims: AuthClaims,
) -> Result<AppResponse<AccountResponse>, AppError> {
    let account = state.auth.current_account(claims.sub)?;
    Ok(AppResponse::ok(AccountResponse::from(account)))
}

/// POST /users/me/change-password
pub async fn change_password(
    State(state): State<AppState>,
    claims: AuthClaims,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<AppResponse<serde_json::Value>, AppError> {
    let Json(payload) = payload?;
    state.auth.change_password(claims.sub, &payload)?;
    tracing::debug!(account_id = %claims.sub, email = %claims.email, "Password change accepted");
    Ok(AppResponse::ok(
        serde_json::json!({ "message": "Password changed successfully" }),
    ))
}

/// GET /users/me/login-history
pub async fn login_history(
    State(state): State<AppState>,
    claims: AuthClaims,
) -> Result<AppResponse<Vec<LoginAttemptResponse>>, AppError> {
    Ok(AppResponse::ok(state.auth.login_history(claims.sub)?))
}
