use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

type Result<T> = std::result::Result<T, Error>;

pub const USER_TYPES: [&str; 2] = ["STUDENT", "WORKING"];

#[derive(Clone, Debug, PartialEq)]
pub enum Role {
    Admin,
    User,
}

impl ToString for Role {
    fn to_string(&self) -> String {
        match self {
            Role::Admin => String::from("ADMIN"),
            Role::User => String::from("USER"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub age: Option<i32>,
    pub preferred_city: Option<String>,
    pub user_type: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub is_verified: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub fn is_admin(user: &User) -> bool {
    user.role == Role::Admin.to_string()
}

pub struct CreateUserPayload {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i32>,
    pub preferred_city: Option<String>,
    pub user_type: Option<String>,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(e: E, payload: CreateUserPayload) -> Result<User> {
    sqlx::query_as::<_, User>(
        "
        INSERT INTO users (id, email, phone_number, password_hash, age, preferred_city, user_type, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.email)
    .bind(payload.phone_number)
    .bind(payload.password_hash)
    .bind(payload.age)
    .bind(payload.preferred_city)
    .bind(payload.user_type)
    .bind(Role::User.to_string())
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating a user account: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id.clone())
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching user with id {}: {}", id, err);
            Error::UnexpectedError
        })
}

/// Emails are stored lowercased at signup; email-shaped identifiers are
/// lowercased before matching so the comparison never depends on input
/// casing.
fn normalize_identifier(identifier: String) -> String {
    match identifier.contains('@') {
        true => identifier.to_lowercase(),
        false => identifier,
    }
}

/// Matches a single identifier against either identity column. Sign-in and
/// password reset accept an email or a phone number interchangeably.
pub async fn find_by_identifier<'e, E: PgExecutor<'e>>(
    e: E,
    identifier: String,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 OR phone_number = $1")
        .bind(normalize_identifier(identifier))
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching user by identifier: {}", err);
            Error::UnexpectedError
        })
}

pub struct FindByEmailOrPhoneNumber {
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

pub async fn find_by_email_or_phone_number<'e, E: PgExecutor<'e>>(
    e: E,
    payload: FindByEmailOrPhoneNumber,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "
        SELECT * FROM users
        WHERE ($1::text IS NOT NULL AND email = $1)
           OR ($2::text IS NOT NULL AND phone_number = $2)
        ",
    )
    .bind(payload.email)
    .bind(payload.phone_number)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching user by email or phone: {}", err);
        Error::UnexpectedError
    })
}

pub struct UpdateUserPayload {
    pub age: Option<i32>,
    pub preferred_city: Option<String>,
    pub user_type: Option<String>,
}

pub async fn update_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    payload: UpdateUserPayload,
) -> Result<User> {
    sqlx::query_as::<_, User>(
        "
        UPDATE users SET
            age = COALESCE($1, age),
            preferred_city = COALESCE($2, preferred_city),
            user_type = COALESCE($3, user_type),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        ",
    )
    .bind(payload.age)
    .bind(payload.preferred_city)
    .bind(payload.user_type)
    .bind(id.clone())
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Failed to update user by id {}: {}", id, err);
        Error::UnexpectedError
    })
}

pub async fn set_password_hash<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    password_hash: String,
) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(id.clone())
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Failed to set password for user {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn mark_email_verified<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<()> {
    sqlx::query(
        "
        UPDATE users SET
            email_verified = TRUE,
            is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id.clone())
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Failed to mark email verified for user {}: {}", id, err);
        Error::UnexpectedError
    })
}

pub async fn mark_phone_verified<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<()> {
    sqlx::query(
        "
        UPDATE users SET
            phone_verified = TRUE,
            is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id.clone())
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Failed to mark phone verified for user {}: {}", id, err);
        Error::UnexpectedError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_identifiers_are_lowercased() {
        assert_eq!(
            normalize_identifier("Foo@Bar.com".to_string()),
            "foo@bar.com"
        );
    }

    #[test]
    fn phone_identifiers_are_untouched() {
        assert_eq!(
            normalize_identifier("+911234567890".to_string()),
            "+911234567890"
        );
    }
}
