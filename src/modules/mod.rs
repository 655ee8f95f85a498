pub mod auth;
pub mod place;
pub mod review;
pub mod user;

mod router;
pub use router::get_router;
