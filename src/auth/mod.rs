pub mod extractors;
pub mod jwt;
pub mod lockout;
pub mod password;
pub mod rate_limit;
pub mod services;
