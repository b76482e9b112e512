use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Moderation and analytics, nested under `/api/admin`. The route table requires the
/// admin tier for the whole prefix, and every handler additionally takes `AdminUser`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::admin_home))
        // --- Users ---
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        // Both actions are written to admin_logs.
        .route("/users/{id}/ban", post(admin::ban_user))
        .route("/users/{id}/promote", post(admin::promote_user))
        // --- Chats ---
        .route("/chats", get(admin::list_chats))
        .route("/chats/{id}", get(admin::get_chat).delete(admin::delete_chat))
        .route("/chats/{id}/messages", get(admin::list_chat_messages))
        // --- Help requests ---
        .route("/help-requests", get(admin::list_help_requests))
        .route(
            "/help-requests/{id}",
            get(admin::get_help_request)
                .put(admin::update_help_request)
                .patch(admin::patch_help_request)
                .delete(admin::delete_help_request),
        )
        // --- Analytics ---
        .route("/dashboard", get(admin::get_dashboard_stats))
        .route("/analytics", get(admin::get_analytics))
        .route("/analytics/health", get(admin::get_system_health))
}
