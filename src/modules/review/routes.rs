use std::sync::Arc;

use super::{repository, service};
use crate::{
    modules::{auth::middleware::Auth, place},
    types::Context,
    utils::{self, pagination::Pagination},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

#[derive(Deserialize, Validate)]
struct CreateReviewPayload {
    place_id: String,
    #[validate(range(min = 1, max = 5, code = "INVALID_RATING"))]
    rating: i32,
    #[serde(default)]
    comment: String,
}

async fn create_review(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<CreateReviewPayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match place::repository::find_by_id(&ctx.db_conn.pool, payload.place_id.clone()).await {
        Ok(Some(_)) => (),
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Place not found" })),
            )
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to create review" })),
            )
        }
    }

    let review = match repository::create(
        &ctx.db_conn.pool,
        repository::CreateReviewPayload {
            user_id: auth.user.id.clone(),
            place_id: payload.place_id.clone(),
            rating: payload.rating,
            comment: payload.comment,
        },
    )
    .await
    {
        Ok(review) => review,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to create review" })),
            )
        }
    };

    // The denormalized average follows the committed review set.
    if service::recompute_average(&ctx.db_conn.pool, payload.place_id)
        .await
        .is_err()
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update place rating" })),
        );
    }

    (StatusCode::CREATED, Json(json!(review)))
}

async fn get_place_reviews(
    State(ctx): State<Arc<Context>>,
    Path(place_id): Path<String>,
    pagination: Pagination,
) -> impl IntoResponse {
    match repository::find_many_by_place_id(&ctx.db_conn.pool, place_id, pagination).await {
        Ok(paginated_reviews) => (StatusCode::OK, Json(json!(paginated_reviews))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch reviews" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", post(create_review))
        .route("/place/:place_id", get(get_place_reviews))
}
