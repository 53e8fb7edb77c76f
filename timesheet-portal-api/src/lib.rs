//! # timesheet-portal-api
//!
//! Shared API types for the timesheet-portal service.
//! This crate is designed to be WASM-compatible and can be used in both
//! backend (Rust) and frontend (WASM/TypeScript via wasm-bindgen) applications.
//!
//! ## Features
//!
//! - Request DTOs (LoginRequest, SaveTimesheetRequest, etc.)
//! - Response DTOs (LoginResponse, TimesheetResponse, etc.)
//! - Error response format (ErrorResponse, FieldError)
//! - Generic response wrapper (AppResponse)
//!
//! ## Example
//!
//! ```rust
//! use timesheet_portal_api::LoginRequest;
//!
//! let request = LoginRequest {
//!     identifier: "user@example.com".to_string(),
//!     password: "password123".to_string(),
//! };
//! ```

pub mod error;
pub mod requests;
pub mod responses;
pub mod result;

// Re-exports for convenient access
pub use error::{ErrorResponse, FieldError};
pub use requests::*;
pub use responses::*;
pub use result::{AppResponse, StatusCode};
