use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::{
    AppState,
    authz::{Denial, Verdict, authorize},
    config::AppConfig,
    error::AppError,
    models::Identity,
    role::RoleLevel,
    session::SessionResolver,
};

/// RouteDecision
///
/// Outcome of the edge guard for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectLogin { location: String },
    RedirectForbidden { location: String, required: RoleLevel },
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `<login_path>?callbackUrl=<path>`, with the original path URL-encoded.
pub fn login_location(path: &str, config: &AppConfig) -> String {
    format!("{}?callbackUrl={}", config.login_path, encode(path))
}

/// `<forbidden_path>?reason=<level>_required`.
pub fn forbidden_location(required: RoleLevel, config: &AppConfig) -> String {
    format!("{}?reason={}_required", config.forbidden_path, required)
}

/// API paths get JSON status codes instead of browser redirects.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// decide
///
/// The per-request state machine: a public path is allowed outright, a missing session
/// goes to login, an insufficient role goes to the forbidden page, anything else is
/// allowed.
pub fn decide(
    path: &str,
    required: Option<RoleLevel>,
    identity: Option<&Identity>,
    config: &AppConfig,
) -> RouteDecision {
    match authorize(identity, required) {
        Verdict::Allowed => RouteDecision::Allow,
        Verdict::Denied(Denial::Unauthenticated) => RouteDecision::RedirectLogin {
            location: login_location(path, config),
        },
        Verdict::Denied(Denial::InsufficientRole { required, .. }) => {
            RouteDecision::RedirectForbidden {
                location: forbidden_location(required, config),
                required,
            }
        }
    }
}

impl RouteDecision {
    /// The response for a denied request, or `None` when the request may proceed.
    pub fn denial_response(self, api: bool) -> Option<Response> {
        let response = match (self, api) {
            (RouteDecision::Allow, _) => return None,
            (RouteDecision::RedirectLogin { .. }, true) => AppError::Unauthenticated.into_response(),
            (RouteDecision::RedirectForbidden { required, .. }, true) => {
                AppError::Forbidden { required }.into_response()
            }
            (RouteDecision::RedirectLogin { location }, false)
            | (RouteDecision::RedirectForbidden { location, .. }, false) => {
                Redirect::temporary(&location).into_response()
            }
        };
        Some(response)
    }
}

/// edge_guard
///
/// Router-wide authorization layer. Classifies the path through the route table, resolves
/// the session only for non-public paths and, on success, stores the `Identity` in the
/// request extensions for the `AuthUser` extractor. Denied requests never reach a handler.
pub async fn edge_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let required = state.routes.classify(&path);

    if required.is_none() {
        return next.run(request).await;
    }

    let resolver = SessionResolver::new(state.repo.clone(), state.config.clone());
    let identity = match resolver.resolve(request.headers()).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    let decision = decide(&path, required, identity.as_ref(), &state.config);
    if decision != RouteDecision::Allow {
        tracing::info!(%path, ?decision, "request denied at edge");
    }
    if let Some(denied) = decision.denial_response(is_api_path(&path)) {
        return denied;
    }

    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}
