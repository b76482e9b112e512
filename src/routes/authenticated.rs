use crate::{AppState, handlers::user};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// The end-user API. All prefixes here require the `user` tier in the route table; the
/// handlers receive the resolved caller through `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        .route("/api/auth/session", get(user::get_session))
        // Bearer capability for the chat backend (the caller's email).
        .route("/api/auth/token", get(user::get_token))
        // --- Dashboard & account ---
        .route("/api/dashboard", get(user::get_dashboard))
        .route("/api/dashboard/update", post(user::update_dashboard))
        // Removes usage logs, subscriptions and the account atomically.
        .route("/api/dashboard/settings/delete", delete(user::delete_account))
        .route(
            "/api/user/wallet",
            get(user::get_wallet).post(user::set_wallet),
        )
        // --- Backend proxies ---
        .route("/api/rate-limit/check", get(user::check_rate_limit))
        .route("/api/dashboard/upgrade/plan", get(user::get_plan))
        .route("/api/dashboard/upgrade/upgrade", post(user::upgrade_plan))
        .route("/api/dashboard/upgrade/cancel", post(user::cancel_plan))
        // --- Help requests ---
        .route(
            "/api/help-requests",
            get(user::list_my_help_requests).post(user::create_help_request),
        )
}
