pub mod model;
pub mod notifications;
pub mod services;
pub mod state;
pub mod validation;
