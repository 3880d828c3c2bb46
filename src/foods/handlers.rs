use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::portion::PortionInfo;
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct FoodList {
    pub total_foods: usize,
    pub foods: Vec<FoodSummary>,
}

pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/portion-info", post(portion_info))
}

pub async fn list_foods(State(state): State<AppState>) -> Json<FoodList> {
    let foods = state
        .catalog
        .all()
        .iter()
        .map(|r| FoodSummary {
            name: r.name.clone(),
            category: r.category.clone(),
        })
        .collect();
    Json(FoodList {
        total_foods: state.catalog.len(),
        foods,
    })
}

/// Requires a login but does not count against the daily budget.
#[instrument(skip(state, body))]
pub async fn portion_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PortionInfo>, ApiError> {
    let Json(body) = body?;
    let food = match body.get("food") {
        None => {
            return Err(ApiError::bad_request(
                "Invalid request format",
                "Request must contain \"food\" field",
            ))
        }
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => {
            return Err(ApiError::bad_request(
                "Invalid food name",
                "Food name must be a non-empty string",
            ))
        }
    };

    Ok(Json(state.portions.describe(&food).await))
}
