use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::dto::{CalculateGlResponse, ParseMealResponse, SmartParseResponse};
use super::model::MealItemRequest;
use super::parser::{ParseError, SmartParse};
use crate::{auth::extractors::MeteredUser, error::ApiError, state::AppState};

/// Every route here is metered against the caller's daily budget.
pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/calculate-gl", post(calculate_gl))
        .route("/parse-meal-chat", post(parse_meal_chat))
        .route("/parse-meal-smart", post(parse_meal_smart))
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn calculate_gl(
    State(state): State<AppState>,
    user: MeteredUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CalculateGlResponse>, ApiError> {
    let Json(body) = body?;
    let meal = match body.get("meal") {
        Some(Value::Array(lines)) => lines,
        Some(_) => {
            return Err(ApiError::bad_request(
                "Invalid meal format",
                "\"meal\" must be an array of food items",
            ))
        }
        None => {
            return Err(ApiError::bad_request(
                "Invalid request format",
                "Request must contain \"meal\" array",
            ))
        }
    };

    let lines: Vec<MealItemRequest> = meal.iter().map(MealItemRequest::from_value).collect();
    let result = state.evaluator.evaluate(&lines).await;

    Ok(Json(CalculateGlResponse {
        total_gl: result.total_glycemic_load,
        items: result.items,
        suggestions: result.suggestions,
        usage: user.usage,
    }))
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn parse_meal_chat(
    State(state): State<AppState>,
    user: MeteredUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ParseMealResponse>, ApiError> {
    let text = meal_text(body)?;
    let meal = state.parser.parse_free_text(&text).await.map_err(parse_failure)?;
    if meal.is_empty() {
        return Err(no_food_items());
    }
    Ok(Json(ParseMealResponse {
        meal,
        usage: user.usage,
    }))
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn parse_meal_smart(
    State(state): State<AppState>,
    user: MeteredUser,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SmartParseResponse>, ApiError> {
    let text = meal_text(body)?;
    match state.parser.parse_and_disambiguate(&text).await.map_err(parse_failure)? {
        SmartParse::NoFoodItems => Err(no_food_items()),
        SmartParse::Items(items) => Ok(Json(SmartParseResponse {
            status: "success",
            items,
            usage: user.usage,
        })),
    }
}

fn meal_text(body: Result<Json<Value>, JsonRejection>) -> Result<String, ApiError> {
    let Json(body) = body?;
    match body.get("text") {
        None => Err(ApiError::bad_request(
            "Invalid request format",
            "Request must contain \"text\" field",
        )),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(_) => Err(ApiError::bad_request(
            "Invalid meal text",
            "Meal text must be a non-empty string",
        )),
    }
}

fn parse_failure(e: ParseError) -> ApiError {
    match e {
        ParseError::Unavailable => ApiError::Unavailable("Meal parsing"),
        other => {
            warn!(error = %other, "could not parse meal");
            ApiError::bad_request("Could not parse meal", "Please describe the meal differently and try again")
        }
    }
}

fn no_food_items() -> ApiError {
    ApiError::bad_request("No food items found", "No food items found in your description")
}
