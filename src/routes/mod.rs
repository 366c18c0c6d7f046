pub mod assets;
pub mod auth;
pub mod home;
pub mod posts;
pub mod votes;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The whole site.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/static/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(posts::router())
        .merge(votes::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Parse a numeric id from a query or form field.
pub(crate) fn parse_id(raw: Option<&str>, what: &str) -> AppResult<i64> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {}", what)))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", what, raw)))
}
