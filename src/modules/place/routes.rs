use std::borrow::Cow;
use std::sync::Arc;

use super::{repository, service};
use crate::{
    modules::auth::middleware::{AdminAuth, Auth},
    types::Context,
    utils::{self, pagination::Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

fn validate_place_type(type_: &str) -> Result<(), ValidationError> {
    match repository::PLACE_TYPES.contains(&type_) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_PLACE_TYPE")
            .with_message(Cow::from("Place type must be food or stay"))),
    }
}

fn validate_sub_type(sub_type: &str) -> Result<(), ValidationError> {
    match repository::SUB_TYPES.contains(&sub_type) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_PLACE_SUB_TYPE")
            .with_message(Cow::from("Invalid place sub type"))),
    }
}

fn validate_price_level(price_level: &str) -> Result<(), ValidationError> {
    match repository::PRICE_LEVELS.contains(&price_level) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_PRICE_LEVEL").with_message(Cow::from(
            "Price level must be economical, average or premium",
        ))),
    }
}

#[derive(Deserialize, Validate)]
struct CreatePlacePayload {
    #[validate(length(min = 1, max = 100, code = "INVALID_PLACE_NAME"))]
    name: String,
    #[validate(custom(code = "INVALID_PLACE_TYPE", function = "validate_place_type"))]
    #[serde(rename = "type")]
    type_: String,
    #[validate(custom(code = "INVALID_PLACE_SUB_TYPE", function = "validate_sub_type"))]
    sub_type: String,
    #[validate(length(min = 1, code = "INVALID_ADDRESS"))]
    address: String,
    #[validate(range(min = -90.0, max = 90.0, code = "INVALID_LATITUDE"))]
    latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, code = "INVALID_LONGITUDE"))]
    longitude: f64,
    #[validate(custom(code = "INVALID_PRICE_LEVEL", function = "validate_price_level"))]
    price_level: String,
    #[serde(default)]
    description: String,
    contact_info: Option<String>,
    #[serde(default)]
    tags: String,
    photo: Option<String>,
}

async fn create_place(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<CreatePlacePayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match repository::create(
        &ctx.db_conn.pool,
        repository::CreatePlacePayload {
            name: payload.name,
            type_: payload.type_,
            sub_type: payload.sub_type,
            address: payload.address,
            latitude: payload.latitude,
            longitude: payload.longitude,
            price_level: payload.price_level,
            description: payload.description,
            contact_info: payload.contact_info,
            tags: payload.tags,
            photo: payload.photo,
            added_by: auth.user.id.clone(),
        },
    )
    .await
    {
        Ok(place) => (StatusCode::CREATED, Json(json!(place))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Place creation failed" })),
        ),
    }
}

async fn get_places(
    State(ctx): State<Arc<Context>>,
    Query(filters): Query<repository::FindManyFilters>,
    pagination: Pagination,
) -> impl IntoResponse {
    match repository::find_many(&ctx.db_conn.pool, pagination, filters).await {
        Ok(paginated_places) => (StatusCode::OK, Json(json!(paginated_places))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch places" })),
        ),
    }
}

async fn get_place_by_id(
    State(ctx): State<Arc<Context>>,
    auth: Option<Auth>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let not_found = (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Place not found" })),
    );

    match auth {
        Some(auth) => {
            match repository::find_by_id_user(&ctx.db_conn.pool, id, auth.user.id.clone()).await {
                Ok(Some(place)) => (StatusCode::OK, Json(json!(place))),
                Ok(None) => not_found,
                Err(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to fetch place" })),
                ),
            }
        }
        None => match repository::find_by_id(&ctx.db_conn.pool, id).await {
            Ok(Some(place)) => (StatusCode::OK, Json(json!(place))),
            Ok(None) => not_found,
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch place" })),
            ),
        },
    }
}

async fn favorite_place_by_id(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match repository::find_by_id(&ctx.db_conn.pool, id.clone()).await {
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
                Json(json!({ "error": "Failed to favorite place" })),
            )
        }
    }

    match repository::favorite_by_id(&ctx.db_conn.pool, id, auth.user.id.clone()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Place favorited successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to favorite place" })),
        ),
    }
}

async fn unfavorite_place_by_id(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match repository::unfavorite_by_id(&ctx.db_conn.pool, id, auth.user.id.clone()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Place unfavorited successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to unfavorite place" })),
        ),
    }
}

async fn report_place_by_id(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !ctx.rate_limiter.allow(&format!("report:{}", auth.user.id)) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        );
    }

    match repository::report_by_id(&ctx.db_conn.pool, id).await {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Place not found" })),
        ),
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Place reported successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to report place" })),
        ),
    }
}

async fn approve_place_by_id(
    State(ctx): State<Arc<Context>>,
    _: AdminAuth,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match repository::approve_by_id(&ctx.db_conn.pool, id).await {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Place not found" })),
        ),
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Place approved successfully" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to approve place" })),
        ),
    }
}

#[derive(Deserialize)]
struct RecommendationsQuery {
    location: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn get_recommendations(
    State(ctx): State<Arc<Context>>,
    Query(query): Query<RecommendationsQuery>,
) -> impl IntoResponse {
    let cache_key = service::cache_key(&query.location, &query.latitude, &query.longitude);

    if let Some(cached) = ctx.recommendations_cache.get(&cache_key) {
        return (StatusCode::OK, Json(cached));
    }

    let recommendations = match (query.latitude, query.longitude) {
        (Some(latitude), Some(longitude)) => {
            match repository::find_approved(&ctx.db_conn.pool).await {
                Ok(places) => json!(service::rank_by_distance(places, latitude, longitude)),
                Err(_) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": "Failed to fetch recommendations" })),
                    )
                }
            }
        }
        _ => match query.location.clone() {
            Some(location) => {
                match repository::find_approved_by_address(&ctx.db_conn.pool, location).await {
                    Ok(places) => json!(places),
                    Err(_) => {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Failed to fetch recommendations" })),
                        )
                    }
                }
            }
            None => {
                match repository::find_top_rated(&ctx.db_conn.pool, service::TOP_RATED_LIMIT).await
                {
                    Ok(places) => json!(places),
                    Err(_) => {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Failed to fetch recommendations" })),
                        )
                    }
                }
            }
        },
    };

    ctx.recommendations_cache
        .put(cache_key, recommendations.clone());

    (StatusCode::OK, Json(recommendations))
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", post(create_place).get(get_places))
        .route("/recommendations", get(get_recommendations))
        .route("/:id", get(get_place_by_id))
        .route("/:id/favorite", put(favorite_place_by_id))
        .route("/:id/unfavorite", put(unfavorite_place_by_id))
        .route("/:id/report", put(report_place_by_id))
        .route("/:id/approve", put(approve_place_by_id))
}
