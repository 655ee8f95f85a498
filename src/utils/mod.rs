pub mod cache;
pub mod database;
pub mod geo;
pub mod notification;
pub mod pagination;
pub mod rate_limiter;
pub mod validation;
