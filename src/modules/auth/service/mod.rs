pub mod auth;
pub mod google;
pub mod otp;
pub mod password;
