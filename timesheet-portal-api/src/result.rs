use serde::{Deserialize, Serialize};

/// HTTP status codes the portal answers with.
/// Kept free of `http`/`axum` so the crate stays WASM-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    Conflict = 409,
    InternalServerError = 500,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }
}

/// Successful response envelope shared by backend and frontend.
///
/// The backend wraps this in a type implementing Axum's `IntoResponse`;
/// a client can deserialize it to know which status the payload came with.
///
/// ```rust
/// use timesheet_portal_api::{AppResponse, StatusCode};
///
/// let response = AppResponse::ok("data");
/// assert_eq!(response.status, StatusCode::Ok);
///
/// let empty: AppResponse<()> = AppResponse::no_content();
/// assert!(empty.data.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub status: StatusCode,
}

impl<T> AppResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status,
            data: Some(data),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, data: None }
    }

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::Ok, data)
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(StatusCode::Created, data)
    }

    /// 202 Accepted with data
    pub fn accepted(data: T) -> Self {
        Self::new(StatusCode::Accepted, data)
    }
}

impl AppResponse<()> {
    /// 204 No Content
    pub fn no_content() -> Self {
        Self::empty(StatusCode::NoContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Payload {
        week: String,
    }

    #[test]
    fn ok_carries_payload() {
        let data = Payload {
            week: "2025-01-06".to_string(),
        };
        let response = AppResponse::ok(data.clone());
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.data, Some(data));
    }

    #[test]
    fn no_content_has_no_payload() {
        let response = AppResponse::no_content();
        assert_eq!(response.status, StatusCode::NoContent);
        assert!(response.data.is_none());
    }

    #[test]
    fn status_numbers_match_http() {
        assert_eq!(StatusCode::Accepted.as_u16(), 202);
        assert_eq!(StatusCode::Conflict.as_u16(), 409);
        assert!(StatusCode::Created.is_success());
        assert!(!StatusCode::Conflict.is_success());
    }

    #[test]
    fn empty_payload_is_not_serialized() {
        let json = serde_json::to_string(&AppResponse::no_content()).unwrap();
        assert_eq!(json, r#"{"status":"NoContent"}"#);
    }
}
