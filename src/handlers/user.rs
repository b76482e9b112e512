use axum::{extract::State, http::StatusCode};
use chrono::Utc;

use crate::{
    AppState,
    auth::AuthUser,
    backend::{CancelResponse, PlanStatus, RateLimitStatus, UpgradeRequest, UpgradeResponse},
    error::{AppError, AppResult},
    extract::{Json, Query},
    models::{
        CreateHelpRequest, HelpRequest, Page, PageParams, PageRequest, ProfileResponse,
        SessionInfo, SuccessResponse, TokenResponse, UpdateProfileRequest, WalletRequest,
        WalletResponse, WalletSaved, validate_wallet_address,
    },
};

// --- Session ---

/// get_session
///
/// [Authenticated Route] The resolved identity of the caller, with its mapped role.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Current session", body = SessionInfo))
)]
pub async fn get_session(user: AuthUser) -> Json<SessionInfo> {
    Json(SessionInfo {
        id: user.id,
        email: user.email,
        role: user.role,
        role_level: user.role.level(),
    })
}

/// get_token
///
/// [Authenticated Route] The bearer capability for backend calls. This is the caller's
/// email, not a signed credential.
#[utoipa::path(
    get,
    path = "/api/auth/token",
    responses((status = 200, description = "Backend bearer token", body = TokenResponse))
)]
pub async fn get_token(user: AuthUser) -> Json<TokenResponse> {
    Json(TokenResponse {
        token: user.email,
        user_id: user.id,
    })
}

// --- Dashboard ---

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Own profile", body = ProfileResponse),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_dashboard(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state
        .repo
        .get_profile(id)
        .await?
        .ok_or(AppError::NotFound("Profile"))?;
    Ok(Json(ProfileResponse { user: profile }))
}

#[utoipa::path(
    post,
    path = "/api/dashboard/update",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = SuccessResponse),
        (status = 400, description = "No data provided")
    )
)]
pub async fn update_dashboard(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let update = payload.validate()?;
    if !state.repo.update_profile(id, update).await? {
        return Err(AppError::NotFound("User"));
    }
    Ok(Json(SuccessResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
    }))
}

/// delete_account
///
/// [Authenticated Route] Deletes the caller's usage logs, subscriptions and account in one
/// transaction.
#[utoipa::path(
    delete,
    path = "/api/dashboard/settings/delete",
    responses((status = 200, description = "Account deleted", body = SuccessResponse))
)]
pub async fn delete_account(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse>> {
    if !state.repo.delete_account(id).await? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = %id, "account deleted");
    Ok(Json(SuccessResponse {
        success: true,
        message: "Account deleted successfully".to_string(),
    }))
}

// --- Wallet ---

#[utoipa::path(
    get,
    path = "/api/user/wallet",
    responses((status = 200, description = "Linked wallet, null when unlinked", body = WalletResponse))
)]
pub async fn get_wallet(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<WalletResponse>> {
    let wallet = state.repo.get_wallet(id).await?;
    Ok(Json(WalletResponse { wallet }))
}

#[utoipa::path(
    post,
    path = "/api/user/wallet",
    request_body = WalletRequest,
    responses(
        (status = 200, description = "Wallet linked", body = WalletSaved),
        (status = 400, description = "Missing or malformed Solana address")
    )
)]
pub async fn set_wallet(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<WalletRequest>,
) -> AppResult<Json<WalletSaved>> {
    let wallet = validate_wallet_address(payload.wallet)?;
    if !state.repo.set_wallet(id, &wallet).await? {
        return Err(AppError::NotFound("User"));
    }
    Ok(Json(WalletSaved {
        success: true,
        wallet,
    }))
}

// --- Backend proxies ---

/// check_rate_limit
///
/// [Authenticated Route] The caller's message allowance from the backend, with the tier
/// label normalized. When the backend is unreachable the free-tier defaults are returned
/// instead of an error.
#[utoipa::path(
    get,
    path = "/api/rate-limit/check",
    responses((status = 200, description = "Rate limit status", body = RateLimitStatus))
)]
pub async fn check_rate_limit(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<RateLimitStatus> {
    let now = Utc::now();
    match state.backend.rate_limit(&email).await {
        Ok(data) => Json(RateLimitStatus::from_backend(&email, data, now)),
        Err(e) => {
            tracing::warn!(error = %e, "rate limit check failed; using free-tier defaults");
            Json(RateLimitStatus::fallback(now))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/dashboard/upgrade/plan",
    responses((status = 200, description = "Current plan", body = PlanStatus))
)]
pub async fn get_plan(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<PlanStatus> {
    match state.backend.plan(&email).await {
        Ok(plan) => Json(plan),
        Err(e) => {
            tracing::warn!(error = %e, "plan lookup failed; reporting free plan");
            Json(PlanStatus::free())
        }
    }
}

/// upgrade_plan
///
/// [Authenticated Route] Forwards a paid upgrade to the backend, which verifies the
/// transaction. Backend rejections keep their status and message.
#[utoipa::path(
    post,
    path = "/api/dashboard/upgrade/upgrade",
    request_body = UpgradeRequest,
    responses(
        (status = 200, description = "Upgraded", body = UpgradeResponse),
        (status = 400, description = "Missing plan or transaction signature")
    )
)]
pub async fn upgrade_plan(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpgradeRequest>,
) -> AppResult<Json<UpgradeResponse>> {
    let order = payload
        .validate()
        .ok_or_else(|| AppError::validation("Plan and transaction signature required"))?;

    tracing::info!(plan = %order.plan, "processing plan upgrade");
    let upgrade = state.backend.upgrade(&email, &order).await?;
    Ok(Json(UpgradeResponse::from(upgrade)))
}

#[utoipa::path(
    post,
    path = "/api/dashboard/upgrade/cancel",
    responses((status = 200, description = "Subscription cancelled", body = CancelResponse))
)]
pub async fn cancel_plan(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<CancelResponse>> {
    let cancelled = state.backend.cancel(&email).await?;
    Ok(Json(CancelResponse::from(cancelled)))
}

// --- Help requests ---

#[utoipa::path(
    post,
    path = "/api/help-requests",
    request_body = CreateHelpRequest,
    responses(
        (status = 201, description = "Help request created", body = HelpRequest),
        (status = 400, description = "Missing required fields")
    )
)]
pub async fn create_help_request(
    AuthUser { identity, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateHelpRequest>,
) -> AppResult<(StatusCode, Json<HelpRequest>)> {
    let request = payload.validate()?;
    let created = state.repo.create_help_request(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/help-requests",
    params(PageParams),
    responses((status = 200, description = "Own help requests"))
)]
pub async fn list_my_help_requests(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<HelpRequest>>> {
    let page = PageRequest::new(params.page, params.limit, PageRequest::DEFAULT_LIMIT);
    Ok(Json(state.repo.list_user_help_requests(id, page).await?))
}
