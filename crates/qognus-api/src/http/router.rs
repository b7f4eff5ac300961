//! Axum router configuration with middleware.
//!
//! Copilot routes live under `/api/v1/`. Middleware: CORS, tracing.
//!
//! When `[server].web_dir` points at a built dashboard, unknown paths fall
//! through to it, with `index.html` as the client-side routing fallback.
//! If the directory does not exist, only the API is served.

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let web_dir = state.config.server.web_dir.clone();

    let api_routes = Router::new()
        .route("/copilot/stream", post(handlers::copilot::stream_copilot))
        .route("/copilot/sessions", get(handlers::copilot::list_sessions))
        .route(
            "/copilot/sessions/{surface_id}",
            delete(handlers::copilot::delete_session),
        );

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(web_dir) = web_dir.filter(|dir| std::path::Path::new(dir).exists()) {
        let index_path = format!("{web_dir}/index.html");
        let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %web_dir, "dashboard static file serving enabled");
    }

    router
}

/// GET /health - Liveness plus the configured transport.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.provider.name(),
        "model": state.config.model,
    }))
}
