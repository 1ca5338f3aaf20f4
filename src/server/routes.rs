//! Read-only HTTP endpoints over the watcher's derived state.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::warn;

use super::pages;
use crate::sheet::SubmissionStore;
use crate::status::{RECENT_LIMIT, StatusService, health_summary};
use crate::watcher::WatcherState;

/// Shared state for the read endpoints.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub watcher: Arc<WatcherState>,
}

/// Build the router: landing and admin pages, the status table, and the two
/// JSON endpoints for machines.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/admin", get(admin))
        .route("/status", get(status_page))
        .route("/health", get(health))
        .route("/processed_users", get(processed_users))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET / — landing page.
async fn index() -> Html<String> {
    Html(pages::index_page())
}

/// GET /admin — admin page.
async fn admin() -> Html<String> {
    Html(pages::admin_page())
}

/// GET /status — the 10 most recent submissions, read fresh from the sheet.
/// Store failures surface as a plain 500 rather than crashing the request.
async fn status_page(State(state): State<AppState>) -> impl IntoResponse {
    let service = StatusService::new(Arc::clone(&state.store));
    match service.recent(RECENT_LIMIT).await {
        Ok(views) => Html(pages::status_page(&views)).into_response(),
        Err(e) => {
            warn!(error = %e, "Status page read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error retrieving status: {e}"),
            )
                .into_response()
        }
    }
}

/// GET /health — liveness plus watcher counters.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(health_summary(&state.watcher))
}

/// GET /processed_users — every identity key the ledger holds.
async fn processed_users(State(state): State<AppState>) -> impl IntoResponse {
    let keys = state.watcher.ledger.snapshot();
    Json(serde_json::json!({
        "count": keys.len(),
        "processed_users": keys,
    }))
}
