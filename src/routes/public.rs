use crate::{AppState, handlers::public};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Every path here is listed as public in the
/// route table, so the edge guard skips the session lookup for them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health, GET /api/health
        // Liveness for load balancers; answers "ok" without touching the database.
        .route("/health", get(|| async { "ok" }))
        .route("/api/health", get(|| async { "ok" }))
        // POST /api/register
        // Supabase sign-up followed by the local account, profile and subscription rows.
        .route("/api/register", post(public::register_user))
}
