use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminToken, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::accounts())
        .merge(routes::community())
        .merge(routes::forums())
        .merge(routes::moderation())
        .merge(routes::codex())
        .merge(routes::news())
        .with_state(state)
}
