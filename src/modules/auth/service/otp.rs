use rand::Rng;
use sqlx::PgConnection;

use super::super::repository;
use crate::{
    modules::user::repository::User,
    types::Context,
    utils::notification,
};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
pub enum SendError {
    /// The code exists but could not be delivered; the user may request
    /// another one.
    NotSent,
    UnexpectedError,
}

#[derive(Debug)]
pub enum VerificationError {
    InvalidOtp,
    Expired,
    UnexpectedError,
}

pub enum Purpose {
    Verification,
    PasswordReset,
}

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..repository::otp::CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

/// Persists a fresh code for the user and delivers it over the requested
/// channel. The record is committed before delivery is attempted, so a
/// delivery failure leaves a redeemable code behind.
pub async fn send(
    ctx: Arc<Context>,
    user: User,
    channel: repository::otp::Channel,
    purpose: Purpose,
) -> Result<repository::otp::Otp, SendError> {
    let otp = repository::otp::create(
        &ctx.db_conn.pool,
        repository::otp::CreateOtpPayload {
            user_id: user.id.clone(),
            code: generate_code(),
            channel,
        },
    )
    .await
    .map_err(|_| SendError::UnexpectedError)?;

    let notification = match purpose {
        Purpose::Verification => {
            notification::Notification::verification_otp_requested(user, otp.code.clone())
        }
        Purpose::PasswordReset => {
            notification::Notification::password_reset_requested(user, otp.code.clone())
        }
    };

    notification::send(ctx, notification, channel.backend())
        .await
        .map_err(|_| SendError::NotSent)?;

    Ok(otp)
}

async fn consume(
    conn: &mut PgConnection,
    existing_otp: repository::otp::Otp,
) -> Result<repository::otp::Otp, VerificationError> {
    if !existing_otp.is_valid() {
        return Err(VerificationError::Expired);
    }

    // Redemption is at-most-once: the delete must observe the row, or a
    // concurrent verification got there first.
    let deleted = repository::otp::delete_by_id(&mut *conn, existing_otp.id.clone())
        .await
        .map_err(|_| VerificationError::UnexpectedError)?;

    if deleted == 0 {
        return Err(VerificationError::InvalidOtp);
    }

    Ok(existing_otp)
}

/// Redeems a code on the supplied connection. Handlers pass a transaction
/// so the delete and whatever the code unlocks commit or roll back as one;
/// a rolled-back redemption leaves the code usable.
pub async fn verify(
    conn: &mut PgConnection,
    code: String,
) -> Result<repository::otp::Otp, VerificationError> {
    let existing_otp = repository::otp::find_by_code(&mut *conn, code)
        .await
        .map_err(|_| VerificationError::UnexpectedError)?
        .ok_or(VerificationError::InvalidOtp)?;

    consume(conn, existing_otp).await
}

pub async fn verify_for_user(
    conn: &mut PgConnection,
    user_id: String,
    code: String,
) -> Result<repository::otp::Otp, VerificationError> {
    let existing_otp = repository::otp::find_by_user_id_and_code(&mut *conn, user_id, code)
        .await
        .map_err(|_| VerificationError::UnexpectedError)?
        .ok_or(VerificationError::InvalidOtp)?;

    consume(conn, existing_otp).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::user;
    use sqlx::PgPool;
    use ulid::Ulid;

    #[test]
    fn generated_code_is_fixed_length_numeric() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), repository::otp::CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    // Runs only when DATABASE_URL points at a reachable database.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        sqlx::migrate!().run(&pool).await.ok()?;
        Some(pool)
    }

    #[tokio::test]
    async fn redeemed_code_cannot_be_reused() {
        let Some(pool) = test_pool().await else { return };
        let mut conn = pool.acquire().await.expect("Failed to acquire connection");

        let user = user::repository::create(
            &pool,
            user::repository::CreateUserPayload {
                email: Some(format!("{}@example.com", Ulid::new().to_string().to_lowercase())),
                phone_number: None,
                password_hash: None,
                age: None,
                preferred_city: None,
                user_type: None,
            },
        )
        .await
        .expect("Failed to create user");

        // Codes are not unique across users; clear any leftover collision
        // so the lookup below finds exactly this row.
        let code = generate_code();
        sqlx::query("DELETE FROM otps WHERE code = $1")
            .bind(code.clone())
            .execute(&pool)
            .await
            .expect("Failed to clear colliding otps");

        let otp = repository::otp::create(
            &pool,
            repository::otp::CreateOtpPayload {
                user_id: user.id,
                code,
                channel: repository::otp::Channel::Email,
            },
        )
        .await
        .expect("Failed to create otp");

        assert!(verify(&mut conn, otp.code.clone()).await.is_ok());
        assert!(matches!(
            verify(&mut conn, otp.code).await,
            Err(VerificationError::InvalidOtp)
        ));
    }
}
