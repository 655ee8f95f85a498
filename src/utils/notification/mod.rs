pub mod email;
pub mod sms;

use crate::{modules::user::repository::User, types::Context};
use std::sync::Arc;

#[derive(Clone)]
pub enum Notification {
    VerificationOtpRequested { user: User, code: String },
    PasswordResetRequested { user: User, code: String },
}

impl Notification {
    pub fn verification_otp_requested(user: User, code: String) -> Self {
        Self::VerificationOtpRequested { user, code }
    }

    pub fn password_reset_requested(user: User, code: String) -> Self {
        Self::PasswordResetRequested { user, code }
    }
}

pub enum Backend {
    Email,
    Sms,
}

#[derive(Debug)]
pub enum Error {
    NotSent,
}

pub type Result<T> = std::result::Result<T, Error>;

pub async fn send(ctx: Arc<Context>, notification: Notification, backend: Backend) -> Result<()> {
    match backend {
        Backend::Email => email::send(ctx, notification).await,
        Backend::Sms => sms::send(ctx, notification).await,
    }
}
