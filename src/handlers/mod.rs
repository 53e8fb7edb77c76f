pub mod approvals;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod timesheets;
pub mod users;
