use axum::extract::State;
use timesheet_portal_api::TimesheetSummaryResponse;

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /approvals/pending
/// Timesheets waiting on the caller, oldest submission first.
pub async fn pending(
    State(state): State<AppState>,
    claims: AuthClaims,
) -> Result<AppResponse<Vec<TimesheetSummaryResponse>>, AppError> {
    Ok(AppResponse::ok(
        state.timesheets.pending_for_approver(claims.sub)?,
    ))
}
