pub mod catalog;
pub mod handlers;
pub mod portion;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::food_routes()
}
