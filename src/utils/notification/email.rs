use super::{Error, Notification, Result};
use crate::types::Context;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

fn content(notification: &Notification) -> (&'static str, String) {
    match notification {
        Notification::VerificationOtpRequested { code, .. } => (
            "Your CityMate verification code",
            format!("Your verification code is {}", code),
        ),
        Notification::PasswordResetRequested { code, .. } => (
            "Your CityMate password reset code",
            format!("Your password reset code is {}", code),
        ),
    }
}

pub async fn send(ctx: Arc<Context>, notification: Notification) -> Result<()> {
    let user = match &notification {
        Notification::VerificationOtpRequested { user, .. } => user,
        Notification::PasswordResetRequested { user, .. } => user,
    };

    let recipient = user.email.clone().ok_or_else(|| {
        tracing::error!("Cannot send email notification to user {} without an email", user.id);
        Error::NotSent
    })?;

    let (subject, body) = content(&notification);

    let email = Message::builder()
        .from(
            format!("{} <{}>", ctx.mail.sender_name, ctx.mail.sender_email)
                .parse()
                .map_err(|_| Error::NotSent)?,
        )
        .to(recipient.parse().map_err(|_| Error::NotSent)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|err| {
            tracing::error!("Failed to build email: {:?}", err);
            Error::NotSent
        })?;

    let transport: AsyncSmtpTransport<Tokio1Executor> =
        AsyncSmtpTransport::<Tokio1Executor>::relay(ctx.mail.host.as_str())
            .map_err(|err| {
                tracing::error!("Failed to build smtp transport: {:?}", err);
                Error::NotSent
            })?
            .credentials(Credentials::new(
                ctx.mail.user.clone(),
                ctx.mail.password.clone(),
            ))
            .build();

    match transport.send(email).await {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::error!("Failed to send email: {:?}", err);
            Err(Error::NotSent)
        }
    }
}
