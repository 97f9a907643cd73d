// HTTP surface: REST endpoints over the social graph engine and the
// read-side services.

pub mod auth;
pub mod posts;
pub mod users;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::viewer_middleware;
use crate::error::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    let uploads_dir = state.config.uploads.dir.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth::router())
        .nest("/posts", posts::router())
        .nest("/users", users::router())
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_middleware,
        ))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "lookbook",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}

/// Path ids arrive as strings so a malformed id gets the structured
/// failure shape instead of a bare extractor rejection.
pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidOperation(format!("Invalid id: {}", raw)))
}
