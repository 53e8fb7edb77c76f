use axum::extract::{Path, State, rejection::PathRejection};
use timesheet_portal_api::NotificationResponse;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /notifications
pub async fn list(
    State(state): State<AppState>,
    claims: AuthClaims,
) -> Result<AppResponse<Vec<NotificationResponse>>, AppError> {
    Ok(AppResponse::ok(state.notifier.list(claims.sub)?))
}

/// POST /notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<()>, AppError> {
    let Path(id) = id?;
    state.notifier.mark_read(id, claims.sub)?;
    Ok(AppResponse::no_content())
}
