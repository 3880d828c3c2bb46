mod dto;
pub mod evaluator;
pub mod gl;
pub mod handlers;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod suggestions;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_routes()
}
