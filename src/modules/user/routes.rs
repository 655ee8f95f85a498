use std::borrow::Cow;
use std::sync::Arc;

use super::repository;
use crate::{
    modules::auth::middleware::Auth,
    types::Context,
    utils,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

fn validate_user_type(user_type: &str) -> Result<(), ValidationError> {
    match repository::USER_TYPES.contains(&user_type) {
        true => Ok(()),
        false => Err(ValidationError::new("INVALID_USER_TYPE")
            .with_message(Cow::from("User type must be STUDENT or WORKING"))),
    }
}

async fn get_profile(auth: Auth) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(auth.user)))
}

#[derive(Deserialize, Validate)]
struct UpdateProfilePayload {
    #[validate(range(min = 13, max = 120, code = "INVALID_AGE"))]
    age: Option<i32>,
    preferred_city: Option<String>,
    #[validate(custom(code = "INVALID_USER_TYPE", function = "validate_user_type"))]
    user_type: Option<String>,
}

async fn update_profile(
    State(ctx): State<Arc<Context>>,
    auth: Auth,
    Json(payload): Json<UpdateProfilePayload>,
) -> impl IntoResponse {
    if let Err(errors) = payload.validate() {
        return utils::validation::into_response(errors);
    }

    match repository::update_by_id(
        &ctx.db_conn.pool,
        auth.user.id.clone(),
        repository::UpdateUserPayload {
            age: payload.age,
            preferred_city: payload.preferred_city,
            user_type: payload.user_type,
        },
    )
    .await
    {
        Ok(user) => (StatusCode::OK, Json(json!(user))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update profile" })),
        ),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}
