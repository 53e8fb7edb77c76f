use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use timesheet_portal_api::{AppResponse as ApiResponse, StatusCode as ApiStatusCode};

/// Axum side of `timesheet_portal_api::AppResponse`: status conversion,
/// optional extra headers and `IntoResponse`.
///
/// ```rust,ignore
/// AppResponse::ok(timesheet)
/// AppResponse::created(account)
/// AppResponse::no_content()
/// ```
pub struct AppResponse<T> {
    inner: ApiResponse<T>,
    headers: Option<HeaderMap>,
}

impl<T> AppResponse<T>
where
    T: Serialize,
{
    pub fn new(inner: ApiResponse<T>) -> Self {
        Self {
            inner,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(ApiResponse::ok(data))
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(ApiResponse::created(data))
    }

    /// 202 Accepted with data
    pub fn accepted(data: T) -> Self {
        Self::new(ApiResponse::accepted(data))
    }
}

impl AppResponse<()> {
    /// 204 No Content
    pub fn no_content() -> Self {
        Self::new(ApiResponse::no_content())
    }
}

fn convert_status(api_status: ApiStatusCode) -> StatusCode {
    match api_status {
        ApiStatusCode::Ok => StatusCode::OK,
        ApiStatusCode::Created => StatusCode::CREATED,
        ApiStatusCode::Accepted => StatusCode::ACCEPTED,
        ApiStatusCode::NoContent => StatusCode::NO_CONTENT,
        ApiStatusCode::BadRequest => StatusCode::BAD_REQUEST,
        ApiStatusCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiStatusCode::Forbidden => StatusCode::FORBIDDEN,
        ApiStatusCode::NotFound => StatusCode::NOT_FOUND,
        ApiStatusCode::Conflict => StatusCode::CONFLICT,
        ApiStatusCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<T> IntoResponse for AppResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = convert_status(self.inner.status);

        let mut response = match self.inner.data {
            Some(data) => (status, Json(data)).into_response(),
            None => status.into_response(),
        };

        if let Some(headers) = self.headers {
            response.headers_mut().extend(headers);
        }

        response
    }
}
