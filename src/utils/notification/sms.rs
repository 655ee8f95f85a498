use super::{Error, Notification, Result};
use crate::types::Context;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

fn message(notification: &Notification) -> String {
    match notification {
        Notification::VerificationOtpRequested { code, .. } => {
            format!("Your CityMate verification code is {}", code)
        }
        Notification::PasswordResetRequested { code, .. } => {
            format!("Your CityMate password reset code is {}", code)
        }
    }
}

pub async fn send(ctx: Arc<Context>, notification: Notification) -> Result<()> {
    let user = match &notification {
        Notification::VerificationOtpRequested { user, .. } => user,
        Notification::PasswordResetRequested { user, .. } => user,
    };

    let recipient = user.phone_number.clone().ok_or_else(|| {
        tracing::error!("Cannot send sms notification to user {} without a phone number", user.id);
        Error::NotSent
    })?;

    let res = reqwest::Client::new()
        .post(ctx.sms.api_endpoint.clone())
        .json(&json!({
            "api_key": ctx.sms.api_key.clone(),
            "from": ctx.sms.sender_id.clone(),
            "to": recipient,
            "message": message(&notification),
        }))
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to send sms: {}", err);
            Error::NotSent
        })?;

    if res.status() != StatusCode::OK {
        match res.text().await {
            Ok(data) => tracing::error!("Failed to send sms: {}", data),
            Err(err) => tracing::error!("Failed to get sms provider response body: {}", err),
        }
        return Err(Error::NotSent);
    }

    tracing::debug!("Successfully sent sms notification");

    Ok(())
}
