use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

use crate::utils::pagination::{Paginated, Pagination};

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub place_id: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug)]
pub enum Error {
    UnexpectedError,
}

pub struct CreateReviewPayload {
    pub user_id: String,
    pub place_id: String,
    pub rating: i32,
    pub comment: String,
}

pub async fn create<'e, E: PgExecutor<'e>>(
    e: E,
    payload: CreateReviewPayload,
) -> Result<Review, Error> {
    sqlx::query_as::<_, Review>(
        "
        INSERT INTO reviews (id, user_id, place_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.user_id)
    .bind(payload.place_id)
    .bind(payload.rating)
    .bind(payload.comment)
    .fetch_one(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while creating a review: {}", err);
        Error::UnexpectedError
    })
}

pub async fn find_many_by_place_id<'e, E: PgExecutor<'e> + Copy>(
    e: E,
    place_id: String,
    pagination: Pagination,
) -> Result<Paginated<Review>, Error> {
    let reviews = sqlx::query_as::<_, Review>(
        "
        SELECT * FROM reviews
        WHERE place_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        OFFSET $3
        ",
    )
    .bind(place_id.clone())
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while fetching reviews for place {}: {}", place_id, err);
        Error::UnexpectedError
    })?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(id) FROM reviews WHERE place_id = $1")
        .bind(place_id.clone())
        .fetch_one(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while counting reviews for place {}: {}", place_id, err);
            Error::UnexpectedError
        })?;

    Ok(Paginated::new(
        reviews,
        total as u32,
        pagination.page,
        pagination.per_page,
    ))
}

pub async fn ratings_for_place<'e, E: PgExecutor<'e>>(
    e: E,
    place_id: String,
) -> Result<Vec<i32>, Error> {
    sqlx::query_scalar::<_, i32>("SELECT rating FROM reviews WHERE place_id = $1")
        .bind(place_id.clone())
        .fetch_all(e)
        .await
        .map_err(|err| {
            tracing::error!("Error occurred while fetching ratings for place {}: {}", place_id, err);
            Error::UnexpectedError
        })
}
