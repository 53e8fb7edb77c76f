use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use timesheet_portal_api::{
    AuditEntryResponse, RejectTimesheetRequest, SaveTimesheetRequest, TimesheetResponse,
    TimesheetSummaryResponse, WeekQuery,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::extractors::AuthClaims;
use crate::error::AppError;
use crate::response::AppResponse;

/// GET /timesheets?week_start=YYYY-MM-DD
pub async fn for_week(
    State(state): State<AppState>,
    claims: AuthClaims,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Query(query) = query?;
    let sheet = state.timesheets.get_for_week(claims.sub, query.week_start)?;
    Ok(AppResponse::ok(sheet.into()))
}

/// GET /timesheets/history
pub async fn history(
    State(state): State<AppState>,
    claims: AuthClaims,
) -> Result<AppResponse<Vec<TimesheetSummaryResponse>>, AppError> {
    Ok(AppResponse::ok(state.timesheets.history(claims.sub)?))
}

/// POST /timesheets
/// Crée ou met à jour le brouillon de la semaine
pub async fn save_draft(
    State(state): State<AppState>,
    claims: AuthClaims,
    payload: Result<Json<SaveTimesheetRequest>, JsonRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Json(payload) = payload?;
    let sheet = state.timesheets.save_draft(claims.sub, &payload)?;
    Ok(AppResponse::ok(sheet.into()))
}

/// GET /timesheets/{id}
pub async fn get(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Path(id) = id?;
    let sheet = state.timesheets.get(id, claims.sub)?;
    Ok(AppResponse::ok(sheet.into()))
}

/// DELETE /timesheets/{id}
pub async fn delete_draft(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<()>, AppError> {
    let Path(id) = id?;
    state.timesheets.delete_draft(id, claims.sub)?;
    Ok(AppResponse::no_content())
}

/// GET /timesheets/{id}/audit
pub async fn audit_trail(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<Vec<AuditEntryResponse>>, AppError> {
    let Path(id) = id?;
    Ok(AppResponse::ok(state.timesheets.audit_trail(id, claims.sub)?))
}

/// POST /timesheets/{id}/submit
pub async fn submit(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Path(id) = id?;
    let sheet = state.timesheets.submit(id, claims.sub)?;
    Ok(AppResponse::ok(sheet.into()))
}

/// POST /timesheets/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Path(id) = id?;
    let sheet = state.timesheets.approve(id, claims.sub)?;
    Ok(AppResponse::ok(sheet.into()))
}

/// POST /timesheets/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    claims: AuthClaims,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RejectTimesheetRequest>, JsonRejection>,
) -> Result<AppResponse<TimesheetResponse>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let sheet = state.timesheets.reject(id, claims.sub, &payload.reason)?;
    Ok(AppResponse::ok(sheet.into()))
}
