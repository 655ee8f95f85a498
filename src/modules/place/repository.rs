use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

use crate::utils::pagination::{Paginated, Pagination};

pub const PLACE_TYPES: [&str; 2] = ["food", "stay"];
pub const SUB_TYPES: [&str; 6] = ["mess", "bakery", "stall", "hostel", "pg", "hotel"];
pub const PRICE_LEVELS: [&str; 3] = ["economical", "average", "premium"];

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub type_: String,
    pub sub_type: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_level: String,
    pub description: String,
    pub contact_info: Option<String>,
    pub tags: String,
    pub photo: Option<String>,
    pub is_approved: bool,
    pub reported: bool,
    pub average_rating: f64,
    pub added_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Serialize, Clone, Debug, sqlx::FromRow)]
pub struct PlaceUserFavorited {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub type_: String,
    pub sub_type: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_level: String,
    pub description: String,
    pub contact_info: Option<String>,
    pub tags: String,
    pub photo: Option<String>,
    pub is_approved: bool,
    pub reported: bool,
    pub average_rating: f64,
    pub is_favorited: bool,
    pub added_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreatePlacePayload {
    pub name: String,
    pub type_: String,
    pub sub_type: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_level: String,
    pub description: String,
    pub contact_info: Option<String>,
    pub tags: String,
    pub photo: Option<String>,
    pub added_by: String,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(
    e: E,
    payload: CreatePlacePayload,
) -> Result<Place, Error> {
    sqlx::query_as::<_, Place>(
        "
        INSERT INTO places (
            id,
            name,
            type,
            sub_type,
            address,
            latitude,
            longitude,
            price_level,
            description,
            contact_info,
            tags,
            photo,
            added_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.name)
    .bind(payload.type_)
    .bind(payload.sub_type)
    .bind(payload.address)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.price_level)
    .bind(payload.description)
    .bind(payload.contact_info)
    .bind(payload.tags)
    .bind(payload.photo)
    .bind(payload.added_by)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to create a place: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Place>, Error> {
    sqlx::query_as::<_, Place>("SELECT * FROM places WHERE id = $1")
        .bind(id.clone())
        .fetch_optional(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching place with id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn find_by_id_user<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    user_id: String,
) -> Result<Option<PlaceUserFavorited>, Error> {
    sqlx::query_as::<_, PlaceUserFavorited>(
        "
        SELECT
            places.*,
            EXISTS (
                SELECT 1
                FROM place_favorites
                WHERE place_favorites.place_id = places.id
                  AND place_favorites.user_id = $2
            ) AS is_favorited
        FROM places WHERE id = $1
        ",
    )
    .bind(id.clone())
    .bind(user_id)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching place with id {}: {}", id, err);
        Error::UnexpectedError
    })
}

#[derive(Deserialize, Clone)]
pub struct FindManyFilters {
    pub search: Option<String>,
    pub location: Option<String>,
    pub min_rating: Option<f64>,
    pub price: Option<String>,
}

const FIND_MANY_CONDITIONS: &str = "
    is_approved = TRUE
    AND ($1::text IS NULL
        OR name ILIKE CONCAT('%', $1, '%')
        OR description ILIKE CONCAT('%', $1, '%')
        OR tags ILIKE CONCAT('%', $1, '%'))
    AND ($2::text IS NULL OR address ILIKE CONCAT('%', $2, '%'))
    AND ($3::float8 IS NULL OR average_rating >= $3)
    AND ($4::text IS NULL OR price_level = $4)
";

/// Approved places matching every supplied filter; an absent filter is no
/// constraint. The free-text search matches name, description or tags.
pub async fn find_many<'e, E: PgExecutor<'e> + Copy>(
    e: E,
    pagination: Pagination,
    filters: FindManyFilters,
) -> Result<Paginated<Place>, Error> {
    let places = sqlx::query_as::<_, Place>(&format!(
        "
        SELECT * FROM places
        WHERE {}
        ORDER BY created_at DESC
        LIMIT $5
        OFFSET $6
        ",
        FIND_MANY_CONDITIONS
    ))
    .bind(filters.search.clone())
    .bind(filters.location.clone())
    .bind(filters.min_rating)
    .bind(filters.price.clone())
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to fetch many places: {}", err);
        Error::UnexpectedError
    })?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(id) FROM places WHERE {}",
        FIND_MANY_CONDITIONS
    ))
    .bind(filters.search)
    .bind(filters.location)
    .bind(filters.min_rating)
    .bind(filters.price)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to count many places: {}", err);
        Error::UnexpectedError
    })?;

    Ok(Paginated::new(
        places,
        total as u32,
        pagination.page,
        pagination.per_page,
    ))
}

pub async fn find_approved<'e, E: PgExecutor<'e>>(e: E) -> Result<Vec<Place>, Error> {
    sqlx::query_as::<_, Place>("SELECT * FROM places WHERE is_approved = TRUE")
        .fetch_all(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching approved places: {}", err);
            Error::UnexpectedError
        })
}

pub async fn find_approved_by_address<'e, E: PgExecutor<'e>>(
    e: E,
    location: String,
) -> Result<Vec<Place>, Error> {
    sqlx::query_as::<_, Place>(
        "SELECT * FROM places WHERE is_approved = TRUE AND address ILIKE CONCAT('%', $1::text, '%')",
    )
    .bind(location)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching places by address: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_top_rated<'e, E: PgExecutor<'e>>(e: E, limit: i64) -> Result<Vec<Place>, Error> {
    sqlx::query_as::<_, Place>(
        "SELECT * FROM places WHERE is_approved = TRUE ORDER BY average_rating DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching top rated places: {}", err);
        Error::UnexpectedError
    })
}

/// Membership insert; repeated favorites are swallowed by the conflict
/// clause so the set never gains duplicates.
pub async fn favorite_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    user_id: String,
) -> Result<(), Error> {
    sqlx::query(
        "
        INSERT INTO place_favorites (id, user_id, place_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, place_id) DO NOTHING
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(user_id)
    .bind(id.clone())
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Failed to favorite place by id {}: {}", id, err);
        Error::UnexpectedError
    })
}

/// Removing a favorite that does not exist is a no-op.
pub async fn unfavorite_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    user_id: String,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM place_favorites WHERE place_id = $1 AND user_id = $2")
        .bind(id.clone())
        .bind(user_id)
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Failed to unfavorite place by id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn report_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<u64, Error> {
    sqlx::query("UPDATE places SET reported = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id.clone())
        .execute(e)
        .await
        .map(|result| result.rows_affected())
        .map_err(|err| {
            tracing::error!("Failed to report place by id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn approve_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<u64, Error> {
    sqlx::query("UPDATE places SET is_approved = TRUE, updated_at = NOW() WHERE id = $1")
        .bind(id.clone())
        .execute(e)
        .await
        .map(|result| result.rows_affected())
        .map_err(|err| {
            tracing::error!("Failed to approve place by id {}: {}", id, err);
            Error::UnexpectedError
        })
}

pub async fn update_average_rating<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    average_rating: f64,
) -> Result<(), Error> {
    sqlx::query("UPDATE places SET average_rating = $1, updated_at = NOW() WHERE id = $2")
        .bind(average_rating)
        .bind(id.clone())
        .execute(e)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Failed to update average rating for place {}: {}", id, err);
            Error::UnexpectedError
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::user;
    use sqlx::PgPool;

    // These run only when DATABASE_URL points at a reachable database.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        sqlx::migrate!().run(&pool).await.ok()?;
        Some(pool)
    }

    async fn seed_user(pool: &PgPool) -> user::repository::User {
        user::repository::create(
            pool,
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
        .expect("Failed to create user")
    }

    async fn seed_place(pool: &PgPool, added_by: String) -> Place {
        create(
            pool,
            CreatePlacePayload {
                name: "Annapoorna".to_string(),
                type_: "food".to_string(),
                sub_type: "mess".to_string(),
                address: "RS Puram, Coimbatore".to_string(),
                latitude: 11.0,
                longitude: 76.95,
                price_level: "economical".to_string(),
                description: String::new(),
                contact_info: None,
                tags: String::new(),
                photo: None,
                added_by,
            },
        )
        .await
        .expect("Failed to create place")
    }

    #[tokio::test]
    async fn repeated_favorites_keep_a_single_row() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let place = seed_place(&pool, user.id.clone()).await;

        favorite_by_id(&pool, place.id.clone(), user.id.clone())
            .await
            .expect("Failed to favorite place");
        favorite_by_id(&pool, place.id.clone(), user.id.clone())
            .await
            .expect("Failed to favorite place twice");

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(id) FROM place_favorites WHERE place_id = $1 AND user_id = $2",
        )
        .bind(place.id)
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to count favorites");

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unfavoriting_without_a_favorite_succeeds() {
        let Some(pool) = test_pool().await else { return };
        let user = seed_user(&pool).await;
        let place = seed_place(&pool, user.id.clone()).await;

        assert!(unfavorite_by_id(&pool, place.id, user.id).await.is_ok());
    }
}
