// src/error.rs

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use timesheet_portal_api::{ErrorResponse, FieldError};

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::db::error::RepositoryError;
use crate::timesheets::state::TransitionError;
use crate::timesheets::validation::ValidationErrors;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    // === Erreurs Repository ===
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Erreurs d'Authentification ===
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Account locked until {until}")]
    AccountLocked {
        until: DateTime<Utc>,
        retry_after_secs: u64,
    },
    #[error("Email or username already exists")]
    UserAlreadyExists,
    #[error("Password too weak: {0}")]
    WeakPassword(String),
    #[error("Invalid token")]
    InvalidToken,

    // === Erreurs de Hashing/Cryptographie ===
    #[error("Password hashing failed: {0}")]
    PasswordHashingFailed(String),
    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),

    // === Erreurs de Validation ===
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Erreurs métier ===
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Too many requests, retry after {retry_after_secs}s")]
    TooManyRequests { retry_after_secs: u64 },

    // === Erreurs internes ===
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

struct ErrorInfo {
    status: StatusCode,
    code: &'static str,
    message: String,
    internal_detail: Option<String>,
}

impl ErrorInfo {
    fn public(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            internal_detail: None,
        }
    }

    fn internal(code: &'static str, message: &str, detail: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message: message.to_string(),
            internal_detail: Some(detail.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let info = self.get_error_info();

        if let Some(ref detail) = info.internal_detail {
            tracing::error!(error_code = info.code, status = %info.status, detail, "Internal server error");
        }

        let retry_after = match &self {
            AppError::TooManyRequests { retry_after_secs }
            | AppError::AccountLocked {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: info.code.to_string(),
            message: info.message,
            field_errors: self.field_errors(),
        });

        let mut response = (info.status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl AppError {
    /// Récupère les informations d'erreur formatées pour la réponse HTTP
    fn get_error_info(&self) -> ErrorInfo {
        match self {
            // 404 Not Found
            AppError::NotFound(msg) => ErrorInfo::public(StatusCode::NOT_FOUND, "NOT_FOUND", msg),

            // 409 Conflict
            AppError::Duplicate(msg) => {
                ErrorInfo::public(StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg)
            }
            AppError::Conflict(msg) => ErrorInfo::public(StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::UserAlreadyExists => ErrorInfo::public(
                StatusCode::CONFLICT,
                "USER_EXISTS",
                "Email or username already exists",
            ),

            // 401 Unauthorized
            AppError::InvalidCredentials => ErrorInfo::public(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials",
            ),
            AppError::InvalidToken => ErrorInfo::public(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Missing, malformed or expired token",
            ),
            AppError::Unauthorized(msg) => {
                ErrorInfo::public(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
            }

            // 403 Forbidden
            AppError::Forbidden(msg) => ErrorInfo::public(StatusCode::FORBIDDEN, "FORBIDDEN", msg),

            // 423 Locked
            AppError::AccountLocked { until, .. } => ErrorInfo::public(
                StatusCode::LOCKED,
                "ACCOUNT_LOCKED",
                format!(
                    "Account is temporarily locked until {}",
                    until.format("%Y-%m-%dT%H:%M:%SZ")
                ),
            ),

            // 400 Bad Request
            AppError::WeakPassword(msg) => {
                ErrorInfo::public(StatusCode::BAD_REQUEST, "WEAK_PASSWORD", msg)
            }
            AppError::Validation(_) => ErrorInfo::public(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "One or more fields are invalid",
            ),
            AppError::InvalidInput(msg) => {
                ErrorInfo::public(StatusCode::BAD_REQUEST, "INVALID_INPUT", msg)
            }

            // 429 Too Many Requests
            AppError::TooManyRequests { .. } => ErrorInfo::public(
                StatusCode::TOO_MANY_REQUESTS,
                "TOO_MANY_REQUESTS",
                "Too many login attempts, try again later",
            ),

            // 500 Internal Server Error
            AppError::PasswordHashingFailed(msg) => ErrorInfo::internal(
                "HASHING_ERROR",
                "An error occurred while processing your request",
                msg,
            ),
            AppError::TokenGenerationFailed(msg) => ErrorInfo::internal(
                "TOKEN_ERROR",
                "An error occurred while generating token",
                msg,
            ),
            AppError::DatabaseError(msg) => ErrorInfo::internal(
                "DATABASE_ERROR",
                "An error occurred with the database",
                msg,
            ),
            AppError::InternalServerError(msg) => ErrorInfo::internal(
                "INTERNAL_ERROR",
                "An internal server error occurred",
                msg,
            ),
        }
    }

    fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AppError::Validation(errors) => errors.fields().to_vec(),
            _ => Vec::new(),
        }
    }

    // === Constructeurs helpers ===
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        AppError::DatabaseError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::InternalServerError(msg.into())
    }

    pub fn validation(field: &str, msg: impl Into<String>) -> Self {
        AppError::Validation(ValidationErrors::single(field, msg))
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    /// Retourne le code de statut HTTP
    #[cfg(test)]
    pub fn status_code(&self) -> StatusCode {
        self.get_error_info().status
    }
}

// === Conversions automatiques depuis d'autres types d'erreurs ===

// Depuis RepositoryError
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::not_found(msg),
            RepositoryError::UniqueViolation(msg) => AppError::Duplicate(msg),
            RepositoryError::StaleWrite(msg) => AppError::Conflict(msg),
            RepositoryError::PoolError(msg)
            | RepositoryError::ForeignKeyViolation(msg)
            | RepositoryError::DatabaseError(msg) => AppError::database(msg),
        }
    }
}

// Depuis TransitionError
impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotOwner | TransitionError::NotApprover => {
                AppError::Forbidden(err.to_string())
            }
            TransitionError::InvalidState { .. } => AppError::Conflict(err.to_string()),
            TransitionError::NoApprover => AppError::validation("approver_id", err.to_string()),
            TransitionError::Invalid(errors) => AppError::Validation(errors),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

// Depuis JwtError
impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::GenerationFailed(e) => AppError::TokenGenerationFailed(e.to_string()),
            JwtError::VerificationFailed(_) | JwtError::Expired => AppError::InvalidToken,
        }
    }
}

// Depuis PasswordError
impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::PasswordHashingFailed(err.to_string())
    }
}

// Depuis axum::extract::rejection::JsonRejection
impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::invalid_input(format!("Invalid JSON: {}", err.body_text()))
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::invalid_input(format!("Invalid query: {}", err.body_text()))
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(err: axum::extract::rejection::PathRejection) -> Self {
        AppError::invalid_input(format!("Invalid path: {}", err.body_text()))
    }
}
