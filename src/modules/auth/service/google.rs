use serde::Deserialize;

use crate::types::Context;
use std::sync::Arc;

#[derive(Debug)]
pub enum Error {
    InvalidToken,
    UnexpectedError,
}

#[derive(Deserialize)]
pub struct TokenClaims {
    pub aud: String,
    pub email: String,
    pub email_verified: String,
}

/// Validates a Google ID token against the tokeninfo endpoint. The provider
/// is treated as opaque; only the audience and the verified email are used.
pub async fn verify_id_token(ctx: Arc<Context>, id_token: String) -> Result<TokenClaims, Error> {
    let res = reqwest::Client::new()
        .get(ctx.google.token_info_endpoint.clone())
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to reach google tokeninfo endpoint: {}", err);
            Error::UnexpectedError
        })?;

    if !res.status().is_success() {
        return Err(Error::InvalidToken);
    }

    let claims = res.json::<TokenClaims>().await.map_err(|err| {
        tracing::error!("Failed to parse google tokeninfo response: {}", err);
        Error::InvalidToken
    })?;

    if claims.aud != ctx.google.client_id {
        tracing::warn!("Google id token audience mismatch");
        return Err(Error::InvalidToken);
    }

    if claims.email_verified != "true" {
        return Err(Error::InvalidToken);
    }

    Ok(claims)
}
