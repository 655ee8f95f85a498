use chrono::{NaiveDateTime, Utc};
use sqlx::PgExecutor;
use ulid::Ulid;

use crate::utils::notification;

pub const CODE_LENGTH: usize = 6;
pub const VALIDITY_MINUTES: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    pub fn backend(&self) -> notification::Backend {
        match self {
            Channel::Email => notification::Backend::Email,
            Channel::Phone => notification::Backend::Sms,
        }
    }
}

impl ToString for Channel {
    fn to_string(&self) -> String {
        match self {
            Channel::Email => String::from("EMAIL"),
            Channel::Phone => String::from("PHONE"),
        }
    }
}

impl TryFrom<String> for Channel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        match value.as_ref() {
            "EMAIL" => Ok(Channel::Email),
            "PHONE" => Ok(Channel::Phone),
            channel => {
                tracing::error!("Invalid otp channel: {}", channel);
                Err(Error::UnexpectedError)
            }
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Otp {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub channel: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl Otp {
    /// A code can be redeemed strictly before its expiry instant.
    pub fn is_valid(&self) -> bool {
        Utc::now().naive_utc() < self.expires_at
    }
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub struct CreateOtpPayload {
    pub user_id: String,
    pub code: String,
    pub channel: Channel,
}

pub async fn create<'e, E: PgExecutor<'e>>(e: E, payload: CreateOtpPayload) -> Result<Otp, Error> {
    sqlx::query_as::<_, Otp>(
        "
        INSERT INTO otps (id, user_id, code, channel, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.user_id)
    .bind(payload.code)
    .bind(payload.channel.to_string())
    .bind(Utc::now().naive_utc() + chrono::Duration::minutes(VALIDITY_MINUTES))
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating otp: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_code<'e, E: PgExecutor<'e>>(e: E, code: String) -> Result<Option<Otp>, Error> {
    sqlx::query_as::<_, Otp>("SELECT * FROM otps WHERE code = $1")
        .bind(code)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching otp by code: {}", err);
            Error::UnexpectedError
        })
}

pub async fn find_by_user_id_and_code<'e, E: PgExecutor<'e>>(
    e: E,
    user_id: String,
    code: String,
) -> Result<Option<Otp>, Error> {
    sqlx::query_as::<_, Otp>("SELECT * FROM otps WHERE user_id = $1 AND code = $2")
        .bind(user_id)
        .bind(code)
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching otp by user and code: {}", err);
            Error::UnexpectedError
        })
}

pub async fn delete_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<u64, Error> {
    sqlx::query("DELETE FROM otps WHERE id = $1")
        .bind(id.clone())
        .execute(e)
        .await
        .map(|result| result.rows_affected())
        .map_err(|err| {
            tracing::error!("Failed to delete otp by id {}: {}", id, err);
            Error::UnexpectedError
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otp_expiring_at(expires_at: NaiveDateTime) -> Otp {
        Otp {
            id: Ulid::new().to_string(),
            user_id: Ulid::new().to_string(),
            code: "123456".to_string(),
            channel: Channel::Email.to_string(),
            expires_at,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn valid_strictly_before_expiry() {
        let otp = otp_expiring_at(Utc::now().naive_utc() + chrono::Duration::minutes(1));
        assert!(otp.is_valid());
    }

    #[test]
    fn invalid_at_or_after_expiry() {
        let otp = otp_expiring_at(Utc::now().naive_utc() - chrono::Duration::seconds(1));
        assert!(!otp.is_valid());
    }

    #[test]
    fn channel_parses_only_known_values() {
        assert_eq!(
            Channel::try_from("EMAIL".to_string()).unwrap(),
            Channel::Email
        );
        assert_eq!(
            Channel::try_from("PHONE".to_string()).unwrap(),
            Channel::Phone
        );
        assert!(Channel::try_from("CARRIER_PIGEON".to_string()).is_err());
    }
}
