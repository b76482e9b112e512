use axum::{body::Bytes, extract::State};
use chrono::Utc;
use uuid::Uuid;

use super::optional_json;
use crate::{
    AppState,
    auth::AdminUser,
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    models::{
        AdminAction, AdminLogEntry, AdminWelcome, AnalyticsRange, BanRequest, ChatFilter,
        ChatMessage, ChatSummary, DashboardStats, HelpRequest, HelpRequestFilter,
        HelpRequestUpdate, MessageResponse, Page, PageParams, PageRequest, PromoteRequest,
        SystemHealth, UpdateUserRequest, UsagePoint, UserFilter, UserSummary, blank_to_none,
    },
};

/// admin_home
///
/// [Admin Route] Confirms admin access for the admin UI.
#[utoipa::path(
    get,
    path = "/api/admin",
    responses(
        (status = 200, description = "Admin session", body = AdminWelcome),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_home(AdminUser(admin): AdminUser) -> Json<AdminWelcome> {
    Json(AdminWelcome {
        message: "Welcome Admin!".to_string(),
        email: admin.email,
        role: admin.role.level(),
        is_admin: true,
    })
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserFilter),
    responses((status = 200, description = "Filtered, paginated users"))
)]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<Page<UserSummary>>> {
    let page = filter.page_request();
    Ok(Json(state.repo.list_users(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    responses(
        (status = 200, description = "User", body = UserSummary),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserSummary>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("User"))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserSummary),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserSummary>> {
    if !state.repo.update_user(id, payload).await? {
        return Err(AppError::NotFound("User"));
    }
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("User"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_user(id).await? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(admin = %admin.email, target = %id, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// ban_user
///
/// [Admin Route] Sets the account status to `banned` and records the action with its
/// optional reason in the admin log.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/ban",
    request_body = BanRequest,
    responses(
        (status = 200, description = "User banned", body = MessageResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn ban_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<MessageResponse>> {
    let request: BanRequest = optional_json(&body)?;
    let audit = AdminLogEntry {
        admin_email: admin.email.clone(),
        action: AdminAction::BanUser,
        target_user_id: Some(id),
        reason: blank_to_none(request.reason),
    };
    if !state.repo.ban_user(id, audit).await? {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(admin = %admin.email, target = %id, "user banned");
    Ok(Json(MessageResponse::new("User banned successfully")))
}

/// promote_user
///
/// [Admin Route] Sets the account's role. Without a body the target is admin; an
/// unrecognized role is rejected rather than mapped to the default.
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/promote",
    request_body = PromoteRequest,
    responses(
        (status = 200, description = "Role updated", body = MessageResponse),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found")
    )
)]
pub async fn promote_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<MessageResponse>> {
    let request: PromoteRequest = optional_json(&body)?;
    let role = request.target_level()?;

    let audit = AdminLogEntry {
        admin_email: admin.email.clone(),
        action: AdminAction::PromoteUser,
        target_user_id: Some(id),
        reason: Some(format!("role set to {}", role)),
    };
    if !state.repo.set_user_role(id, role, audit).await? {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(admin = %admin.email, target = %id, %role, "user role changed");
    Ok(Json(MessageResponse::new(format!(
        "User promoted to {} successfully",
        role
    ))))
}

// --- Chats ---

#[utoipa::path(
    get,
    path = "/api/admin/chats",
    params(ChatFilter),
    responses((status = 200, description = "Filtered, paginated conversations"))
)]
pub async fn list_chats(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(filter): Query<ChatFilter>,
) -> AppResult<Json<Page<ChatSummary>>> {
    let page = filter.page_request();
    Ok(Json(state.repo.list_chats(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/chats/{id}",
    responses(
        (status = 200, description = "Conversation", body = ChatSummary),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn get_chat(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ChatSummary>> {
    state
        .repo
        .get_chat(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Chat"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/chats/{id}",
    responses(
        (status = 200, description = "Chat deleted", body = MessageResponse),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn delete_chat(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_chat(id).await? {
        return Err(AppError::NotFound("Chat"));
    }
    tracing::info!(admin = %admin.email, chat = id, "chat deleted");
    Ok(Json(MessageResponse::new("Chat deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/admin/chats/{id}/messages",
    params(PageParams),
    responses(
        (status = 200, description = "Messages, oldest first"),
        (status = 404, description = "Chat not found")
    )
)]
pub async fn list_chat_messages(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Page<ChatMessage>>> {
    let page = PageRequest::new(params.page, params.limit, PageRequest::MESSAGES_LIMIT);
    state
        .repo
        .list_chat_messages(id, page)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Chat"))
}

// --- Help requests ---

#[utoipa::path(
    get,
    path = "/api/admin/help-requests",
    params(HelpRequestFilter),
    responses((status = 200, description = "Filtered help requests, by priority then newest"))
)]
pub async fn list_help_requests(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(filter): Query<HelpRequestFilter>,
) -> AppResult<Json<Page<HelpRequest>>> {
    let page = filter.page_request();
    Ok(Json(state.repo.list_help_requests(&filter, page).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/help-requests/{id}",
    responses(
        (status = 200, description = "Help request", body = HelpRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_help_request(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<HelpRequest>> {
    state
        .repo
        .get_help_request(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Request"))
}

/// update_help_request
///
/// [Admin Route] Answers a help request: response, status and priority. Audited.
#[utoipa::path(
    put,
    path = "/api/admin/help-requests/{id}",
    request_body = HelpRequestUpdate,
    responses(
        (status = 200, description = "Updated request", body = HelpRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn update_help_request(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<HelpRequestUpdate>,
) -> AppResult<Json<HelpRequest>> {
    let audit = AdminLogEntry {
        admin_email: admin.email,
        action: AdminAction::UpdateHelpRequest,
        target_user_id: None,
        reason: Some(format!("Updated request {}", id)),
    };
    state
        .repo
        .answer_help_request(id, payload, audit)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Request"))
}

/// patch_help_request
///
/// [Admin Route] Triage only: status and priority. Any `response` in the body is ignored
/// and the change is not audited.
#[utoipa::path(
    patch,
    path = "/api/admin/help-requests/{id}",
    request_body = HelpRequestUpdate,
    responses(
        (status = 200, description = "Updated request", body = HelpRequest),
        (status = 404, description = "Request not found")
    )
)]
pub async fn patch_help_request(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<HelpRequestUpdate>,
) -> AppResult<Json<HelpRequest>> {
    let triage = HelpRequestUpdate {
        response: None,
        ..payload
    };
    state
        .repo
        .update_help_request(id, triage)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Request"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/help-requests/{id}",
    responses(
        (status = 200, description = "Request deleted", body = MessageResponse),
        (status = 404, description = "Request not found")
    )
)]
pub async fn delete_help_request(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !state.repo.delete_help_request(id).await? {
        return Err(AppError::NotFound("Request"));
    }
    Ok(Json(MessageResponse::new("Request deleted successfully")))
}

// --- Analytics ---

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Dashboard statistics", body = DashboardStats))
)]
pub async fn get_dashboard_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardStats>> {
    let counts = state.repo.dashboard_counts().await?;
    Ok(Json(DashboardStats::from_counts(&counts, Utc::now())))
}

/// get_analytics
///
/// [Admin Route] Daily conversation usage for the requested window (default: last 30
/// days, never past today).
#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    params(AnalyticsRange),
    responses(
        (status = 200, description = "Daily usage points", body = [UsagePoint]),
        (status = 400, description = "startDate after endDate")
    )
)]
pub async fn get_analytics(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(range): Query<AnalyticsRange>,
) -> AppResult<Json<Vec<UsagePoint>>> {
    let (start, end) = range.resolve(Utc::now().date_naive())?;
    Ok(Json(state.repo.usage_series(start, end).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics/health",
    responses((status = 200, description = "System health", body = SystemHealth))
)]
pub async fn get_system_health(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<SystemHealth>> {
    let metrics = state.repo.health_metrics().await?;
    let backend_online = state.backend.ping().await;
    Ok(Json(SystemHealth::new(&metrics, backend_online, Utc::now())))
}
