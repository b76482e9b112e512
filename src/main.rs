use dao_portal::{
    AppState,
    backend::{BackendState, HttpBackendClient},
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    role::RoleLevel,
    route_table::RouteTable,
    session::DEV_EMAIL_HEADER,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, installs logging, connects to Postgres, builds the backend client
/// and the route table, and serves the router.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dao_portal=debug,tower_http=info,axum=trace".into());

    // Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.dev_identity_header_enabled() {
        tracing::warn!(
            header = DEV_EMAIL_HEADER,
            "Local mode trusts the dev identity header; any caller can act as any account. Set APP_ENV=production when deploying."
        );
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let backend = Arc::new(HttpBackendClient::new(&config)) as BackendState;

    if config.supabase_url.is_none() || config.supabase_key.is_none() {
        tracing::warn!("SUPABASE_URL/SUPABASE_KEY not set; registration will fail");
    }

    let routes = build_route_table(&config);

    let app_state = AppState {
        repo,
        backend,
        config: config.clone(),
        routes: Arc::new(routes),
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {}: {}", config.bind_addr, e));

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}

/// Builds the standard route table and reports its weak spots once at startup.
fn build_route_table(config: &AppConfig) -> RouteTable {
    let unmatched = config.route_default_deny.then_some(RoleLevel::User);
    let table = RouteTable::standard().with_unmatched(unmatched);

    if table.unmatched().is_none() {
        tracing::warn!(
            "paths missing from the route table are public; set ROUTE_DEFAULT_DENY=true to require a session"
        );
    }

    for (earlier, later) in table.shadowed() {
        let patterns = table.patterns();
        tracing::warn!(
            shadowing = %patterns[earlier].prefix,
            shadowed = %patterns[later].prefix,
            "route table entry is unreachable"
        );
    }

    table
}
