use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authorization core: role mapping, the gate, route classification and the edge guard.
pub mod authz;
pub mod middleware;
pub mod role;
pub mod route_table;
pub mod session;

// Application services.
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

// Routers segregated by access tier (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use backend::{BackendState, HttpBackendClient, MockBackendService};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use route_table::RouteTable;

/// ApiDoc
///
/// OpenAPI document for every handler, served at `/api-docs/openapi.json` and browsable
/// at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::public::register_user,
        handlers::user::get_session, handlers::user::get_token, handlers::user::get_dashboard,
        handlers::user::update_dashboard, handlers::user::delete_account,
        handlers::user::get_wallet, handlers::user::set_wallet, handlers::user::check_rate_limit,
        handlers::user::get_plan, handlers::user::upgrade_plan, handlers::user::cancel_plan,
        handlers::user::create_help_request, handlers::user::list_my_help_requests,
        handlers::admin::admin_home, handlers::admin::list_users, handlers::admin::get_user,
        handlers::admin::update_user, handlers::admin::delete_user, handlers::admin::ban_user,
        handlers::admin::promote_user, handlers::admin::list_chats, handlers::admin::get_chat,
        handlers::admin::delete_chat, handlers::admin::list_chat_messages,
        handlers::admin::list_help_requests, handlers::admin::get_help_request,
        handlers::admin::update_help_request, handlers::admin::patch_help_request,
        handlers::admin::delete_help_request, handlers::admin::get_dashboard_stats,
        handlers::admin::get_analytics, handlers::admin::get_system_health
    ),
    components(
        schemas(
            role::RoleLevel, models::UserSummary, models::UpdateUserRequest, models::BanRequest,
            models::PromoteRequest, models::ChatSummary, models::ChatMessage,
            models::HelpRequest, models::HelpRequestUpdate, models::CreateHelpRequest,
            models::DashboardStats, models::UserStats, models::ConversationStats,
            models::MessageStats, models::UsagePoint, models::SystemHealth, models::Profile,
            models::ProfileResponse, models::UpdateProfileRequest, models::WalletRequest,
            models::WalletResponse, models::WalletSaved, models::RegisterUserRequest,
            models::RegisteredUser, models::RegisterResponse, models::SessionInfo,
            models::TokenResponse, models::AdminWelcome, models::MessageResponse,
            models::SuccessResponse, backend::RateLimitStatus, backend::PlanStatus,
            backend::UpgradeRequest, backend::UpgradeResponse, backend::CancelResponse,
        )
    ),
    tags(
        (name = "dao-portal", description = "DAO portal API: accounts, dashboard and administration")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a request needs, constructed once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub backend: BackendState,
    pub config: AppConfig,
    pub routes: Arc<RouteTable>,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.backend.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

async fn not_found() -> Response {
    AppError::NotFound("Route").into_response()
}

/// create_router
///
/// Assembles the routers, puts the edge guard in front of all of them (the fallback
/// included) and adds the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/api/admin", admin::admin_routes())
        .fallback(not_found)
        // Path classification and session checks happen here, before any handler.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::edge_guard,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for a request, tagged with method, URI and the request id
/// set by `SetRequestIdLayer`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
