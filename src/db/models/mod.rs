pub mod account;
pub mod audit_entry;
pub mod login_attempt;
pub mod notification;
pub mod password_reset;
pub mod timesheet;
