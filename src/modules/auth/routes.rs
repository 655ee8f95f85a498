use std::borrow::Cow;
use std::sync::Arc;

use super::{repository, service};
use crate::{
    modules::user,
    types::Context,
    utils,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

fn validate_phone_number(phone_number: &str) -> Result<(), ValidationError> {
    let regex = Regex::new(r"^\+?[0-9]{7,15}$").expect("Invalid phone number regex");
    match regex.is_match(phone_number) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_PHONE_NUMBER").with_message(Cow::from(
            "Phone number must be digits in international format (e.g: +911234567890)",
        ))),
    }
}

fn validate_user_type(user_type: &str) -> Result<(), ValidationError> {
    match user::repository::USER_TYPES.contains(&user_type) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_USER_TYPE")
            .with_message(Cow::from("User type must be STUDENT or WORKING"))),
    }
}

#[derive(Deserialize, Validate)]
struct SignUpPayload {
    #[validate(email(code = "INVALID_USER_EMAIL", message = "Invalid email address"))]
    email: Option<String>,
    #[validate(custom(code = "INVALID_PHONE_NUMBER", function = "validate_phone_number"))]
    phone_number: Option<String>,
    #[validate(length(min = 8, code = "PASSWORD_TOO_SHORT"))]
    password: Option<String>,
    #[validate(range(min = 13, max = 120, code = "INVALID_AGE"))]
    age: Option<i32>,
    preferred_city: Option<String>,
    #[validate(custom(code = "INVALID_USER_TYPE", function = "validate_user_type"))]
    user_type: Option<String>,
}

async fn sign_up(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<SignUpPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let email = payload.email.clone().map(|email| email.to_lowercase());

    let identifier = match email.clone().or(payload.phone_number.clone()) {
        Some(identifier) => identifier,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Provide either email or phone number" })),
            )
        }
    };

    if !ctx.rate_limiter.allow(&format!("sign-up:{}", identifier)) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        );
    }

    let password_hash = match payload.password {
        Some(password) => match service::password::hash(&password) {
            Ok(hash) => Some(hash),
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Signup failed" })),
                )
            }
        },
        None => None,
    };

    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start database transaction: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Signup failed" })),
            );
        }
    };

    match user::repository::find_by_email_or_phone_number(
        &mut *tx,
        user::repository::FindByEmailOrPhoneNumber {
            email: email.clone(),
            phone_number: payload.phone_number.clone(),
        },
    )
    .await
    {
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Signup failed" })),
            )
        }
        Ok(Some(existing_user)) => {
            if existing_user.email.is_some() && existing_user.email == email {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Email already in use" })),
                );
            }
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Phone number already in use" })),
            );
        }
        Ok(None) => (),
    }

    let user = match user::repository::create(
        &mut *tx,
        user::repository::CreateUserPayload {
            email,
            phone_number: payload.phone_number.clone(),
            password_hash,
            age: payload.age,
            preferred_city: payload.preferred_city,
            user_type: payload.user_type,
        },
    )
    .await
    {
        Ok(user) => user,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Signup failed" })),
            )
        }
    };

    if let Err(err) = tx.commit().await {
        tracing::error!("Failed to commit database transaction: {}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Signup failed" })),
        );
    }

    let channel = match user.email {
        Some(_) => repository::otp::Channel::Email,
        None => repository::otp::Channel::Phone,
    };

    // The account is already committed at this point; a delivery failure
    // leaves a user who never received their code, and is reported as such.
    if let Err(_) =
        service::otp::send(ctx.clone(), user, channel, service::otp::Purpose::Verification).await
    {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "Account created but the verification code could not be delivered. Request a new code."
            })),
        );
    }

    (
        StatusCode::CREATED,
        Json(json!({ "message": "User created. Verify OTP." })),
    )
}

#[derive(Deserialize, Validate)]
struct VerifyPayload {
    #[validate(length(equal = 6, code = "INVALID_OTP_CODE"))]
    code: String,
}

async fn verify(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<VerifyPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    if !ctx.rate_limiter.allow(&format!("verify:{}", payload.code)) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        );
    }

    // Redemption and the flag write share a transaction: if marking the
    // channel verified fails, the rollback leaves the code redeemable.
    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start database transaction: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Verification failed" })),
            );
        }
    };

    let otp = match service::otp::verify(&mut *tx, payload.code).await {
        Ok(otp) => otp,
        Err(service::otp::VerificationError::InvalidOtp)
        | Err(service::otp::VerificationError::Expired) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid or expired OTP" })),
            )
        }
        Err(service::otp::VerificationError::UnexpectedError) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Verification failed" })),
            )
        }
    };

    let marked = match repository::otp::Channel::try_from(otp.channel.clone()) {
        Ok(repository::otp::Channel::Email) => {
            user::repository::mark_email_verified(&mut *tx, otp.user_id.clone()).await
        }
        Ok(repository::otp::Channel::Phone) => {
            user::repository::mark_phone_verified(&mut *tx, otp.user_id.clone()).await
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Verification failed" })),
            )
        }
    };

    if marked.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Verification failed" })),
        );
    }

    if let Err(err) = tx.commit().await {
        tracing::error!("Failed to commit database transaction: {}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Verification failed" })),
        );
    }

    match service::auth::create_session(ctx.clone(), otp.user_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({
                "message": "Verified successfully",
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Verification failed" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
struct SignInPayload {
    #[validate(length(min = 1, code = "INVALID_IDENTIFIER"))]
    identifier: String,
    #[validate(length(min = 1, code = "INVALID_PASSWORD"))]
    password: String,
}

async fn sign_in(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<SignInPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    let user =
        match user::repository::find_by_identifier(&ctx.db_conn.pool, payload.identifier).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Invalid credentials" })),
                )
            }
            Err(_) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Sign in failed" })),
                )
            }
        };

    let password_matches = user
        .password_hash
        .as_deref()
        .map(|hash| service::password::verify(&payload.password, hash))
        .unwrap_or(false);

    if !password_matches {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        );
    }

    match service::auth::create_session(ctx.clone(), user.id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Sign in failed" })),
        ),
    }
}

#[derive(Deserialize)]
struct GoogleSignInPayload {
    id_token: String,
}

async fn google_sign_in(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<GoogleSignInPayload>,
) -> impl IntoResponse {
    let claims = match service::google::verify_id_token(ctx.clone(), payload.id_token).await {
        Ok(claims) => claims,
        Err(service::google::Error::InvalidToken) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid Google token" })),
            )
        }
        Err(service::google::Error::UnexpectedError) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Google sign in failed" })),
            )
        }
    };

    let email = claims.email.to_lowercase();

    let user = match user::repository::find_by_email_or_phone_number(
        &ctx.db_conn.pool,
        user::repository::FindByEmailOrPhoneNumber {
            email: Some(email.clone()),
            phone_number: None,
        },
    )
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            let created = user::repository::create(
                &ctx.db_conn.pool,
                user::repository::CreateUserPayload {
                    email: Some(email),
                    phone_number: None,
                    password_hash: None,
                    age: None,
                    preferred_city: None,
                    user_type: None,
                },
            )
            .await;

            match created {
                Ok(user) => {
                    // Google has already vouched for this email.
                    if user::repository::mark_email_verified(&ctx.db_conn.pool, user.id.clone())
                        .await
                        .is_err()
                    {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Google sign in failed" })),
                        );
                    }
                    user
                }
                Err(_) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Google sign in failed" })),
                    )
                }
            }
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Google sign in failed" })),
            )
        }
    };

    match service::auth::create_session(ctx.clone(), user.id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Google sign in failed" })),
        ),
    }
}

#[derive(Deserialize)]
struct RefreshPayload {
    refresh_token: String,
}

async fn refresh(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<RefreshPayload>,
) -> impl IntoResponse {
    match service::auth::regenerate_tokens_for_session(ctx.clone(), payload.refresh_token).await {
        Ok(session) => (
            StatusCode::OK,
            Json(json!({
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
            })),
        ),
        Err(service::auth::Error::InvalidSession) | Err(service::auth::Error::ExpiredToken) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid session token" })),
        ),
        Err(service::auth::Error::UnexpectedError) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to refresh session" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
struct PasswordResetPayload {
    #[validate(length(min = 1, code = "INVALID_IDENTIFIER"))]
    email_or_phone: String,
    #[validate(length(equal = 6, code = "INVALID_OTP_CODE"))]
    code: Option<String>,
    #[validate(length(min = 8, code = "PASSWORD_TOO_SHORT"))]
    new_password: Option<String>,
}

async fn password_reset(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<PasswordResetPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    if !ctx
        .rate_limiter
        .allow(&format!("password-reset:{}", payload.email_or_phone))
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        );
    }

    let user = match user::repository::find_by_identifier(
        &ctx.db_conn.pool,
        payload.email_or_phone.clone(),
    )
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "User not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Password reset failed" })),
            )
        }
    };

    let code = match payload.code {
        None => {
            let channel = match payload.email_or_phone.contains('@') {
                true => repository::otp::Channel::Email,
                false => repository::otp::Channel::Phone,
            };

            return match service::otp::send(
                ctx.clone(),
                user,
                channel,
                service::otp::Purpose::PasswordReset,
            )
            .await
            {
                Ok(_) => (StatusCode::OK, Json(json!({ "message": "Reset OTP sent" }))),
                Err(service::otp::SendError::NotSent) => (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Failed to send OTP" })),
                ),
                Err(service::otp::SendError::UnexpectedError) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Password reset failed" })),
                ),
            };
        }
        Some(code) => code,
    };

    let new_password = match payload.new_password {
        Some(new_password) => new_password,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "New password is required" })),
            )
        }
    };

    let password_hash = match service::password::hash(&new_password) {
        Ok(hash) => hash,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Password reset failed" })),
            )
        }
    };

    // Same transaction for redemption and the password write; a failed
    // write rolls the code back instead of consuming it for nothing.
    let mut tx = match ctx.db_conn.pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!("Failed to start database transaction: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Password reset failed" })),
            );
        }
    };

    if service::otp::verify_for_user(&mut *tx, user.id.clone(), code)
        .await
        .is_err()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid or expired OTP" })),
        );
    }

    if user::repository::set_password_hash(&mut *tx, user.id, password_hash)
        .await
        .is_err()
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Password reset failed" })),
        );
    }

    match tx.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Password reset successfully" })),
        ),
        Err(err) => {
            tracing::error!("Failed to commit database transaction: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Password reset failed" })),
            )
        }
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/verify", post(verify))
        .route("/sign-in", post(sign_in))
        .route("/google", post(google_sign_in))
        .route("/refresh", post(refresh))
        .route("/password-reset", post(password_reset))
}
