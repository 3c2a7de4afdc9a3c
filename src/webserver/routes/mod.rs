use crate::webserver::{state::AppState, utils::error_response};
use axum::{http::StatusCode, response::Response, Router};
use std::sync::Arc;

pub mod live;
pub mod proxy;
pub mod status;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(status::routes())
        .nest("/proxy", api_routes())
        // The dashboard calls `/api/*`, historically rewritten to `/proxy/*`
        .nest("/api", api_routes())
        .fallback(not_found)
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(proxy::routes()).merge(live::routes())
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Endpoint not found", None)
}
