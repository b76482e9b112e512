use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    role::{RawRole, RoleLevel},
};

/// Model label reported for every conversation; the conversations table has no model column.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const UNTITLED_CHAT: &str = "Untitled Chat";
const CHAT_TITLE_CHARS: usize = 50;

// --- Identity ---

/// Identity
///
/// The authenticated principal behind a request, read from `auth_users` on every request.
/// `user_role` is kept raw; callers go through [`Identity::role_level`], which never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub user_role: Option<i32>,
    pub status: Option<String>,
}

impl Identity {
    pub fn role_level(&self) -> RoleLevel {
        RoleLevel::map(self.user_role.map(RawRole::from))
    }
}

/// NewUser
///
/// A freshly signed-up account, keyed by the id issued by Supabase Auth.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub supabase_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
}

// --- Pagination ---

/// PageRequest
///
/// Normalized pagination input. `page` is at least 1 and `limit` is clamped to 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MESSAGES_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;
    /// Highest page whose offset still fits in an `i64` at the largest limit.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_LIMIT;

    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, Self::MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).max(0).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None, Self::DEFAULT_LIMIT)
    }
}

/// Page
///
/// Envelope for every paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            data,
            total,
            page: request.page,
            limit: request.limit,
            has_more: request.offset().saturating_add(request.limit) < total,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Empty strings in optional payload fields are treated as absent.
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Filter values of "All" (as sent by the admin UI) or blank mean "no filter".
fn active_filter(value: &Option<String>) -> Option<String> {
    blank_to_none(value.clone()).filter(|v| !v.eq_ignore_ascii_case("all"))
}

// --- Users (admin) ---

/// UserRow
///
/// Raw `auth_users` row as selected by the admin listings.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub user_role: Option<i32>,
    pub is_premium: Option<bool>,
    pub status: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// Admin-facing view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub role: RoleLevel,
    pub is_premium: bool,
    pub status: String,
    #[serde(rename = "lastActive")]
    #[ts(type = "string")]
    pub last_active: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserSummary {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: RoleLevel::map(row.user_role.map(RawRole::from)),
            is_premium: row.is_premium.unwrap_or(false),
            status: row.status.unwrap_or_else(|| "active".to_string()),
            last_active: row.last_login.unwrap_or(row.created_at),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Role name ("Admin") or level ("4"). "All" and unrecognized values are ignored.
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, PageRequest::DEFAULT_LIMIT)
    }

    pub fn role_level(&self) -> Option<RoleLevel> {
        active_filter(&self.role).and_then(|role| RoleLevel::parse(&role))
    }

    pub fn status_filter(&self) -> Option<String> {
        active_filter(&self.status)
    }

    pub fn search_term(&self) -> Option<String> {
        blank_to_none(self.search.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

impl UpdateUserRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            status: blank_to_none(self.status),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BanRequest {
    pub reason: Option<String>,
}

/// PromoteRequest
///
/// Target role for a promotion. Accepts a role name or a numeric level; defaults to admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PromoteRequest {
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | number | null")]
    pub role: Option<RawRole>,
}

impl PromoteRequest {
    pub fn target_level(&self) -> AppResult<RoleLevel> {
        match &self.role {
            None => Ok(RoleLevel::Admin),
            Some(raw) => RoleLevel::parse_raw(raw)
                .ok_or_else(|| AppError::validation("Unknown role")),
        }
    }
}

/// AdminAction
///
/// Audited administrative actions, stored as their snake_case names in `admin_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    BanUser,
    PromoteUser,
    UpdateHelpRequest,
}

impl AdminAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::BanUser => "ban_user",
            AdminAction::PromoteUser => "promote_user",
            AdminAction::UpdateHelpRequest => "update_help_request",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminLogEntry {
    pub admin_email: String,
    pub action: AdminAction,
    pub target_user_id: Option<Uuid>,
    pub reason: Option<String>,
}

// --- Chats (admin) ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChatFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
}

impl ChatFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, PageRequest::DEFAULT_LIMIT)
    }

    pub fn search_term(&self) -> Option<String> {
        blank_to_none(self.search.clone())
    }
}

/// ChatRow
///
/// A conversation joined with its owner's display name, its message count and its first
/// user message.
#[derive(Debug, Clone, FromRow)]
pub struct ChatRow {
    pub id: i32,
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_display: Option<String>,
    pub messages_count: i64,
    pub first_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChatSummary {
    pub id: i32,
    pub user_id: Option<Uuid>,
    pub user: String,
    pub title: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub messages_count: i64,
    pub model: String,
}

impl From<ChatRow> for ChatSummary {
    fn from(row: ChatRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user: row.user_display.unwrap_or_else(|| "Unknown".to_string()),
            title: chat_title(row.title.as_deref(), row.first_message.as_deref()),
            date: row.created_at,
            messages_count: row.messages_count,
            model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

/// chat_title
///
/// The stored title when present, otherwise the first user message cut to 50 characters,
/// otherwise "Untitled Chat".
pub fn chat_title(title: Option<&str>, first_message: Option<&str>) -> String {
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        return title.to_string();
    }
    first_message
        .map(|m| m.chars().take(CHAT_TITLE_CHARS).collect::<String>())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNTITLED_CHAT.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: String,
    pub text: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

// --- Help requests ---

/// HelpRequest
///
/// A row of `help_requests`. The SQL column `type` is a Rust keyword, so it is read into
/// `request_type` and written back out as "type" in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct HelpRequest {
    pub id: i64,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub email: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub request_type: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub priority: String,
    pub response: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HelpRequestFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl HelpRequestFilter {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit, PageRequest::DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HelpRequestUpdate {
    pub response: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl HelpRequestUpdate {
    pub fn normalized(self) -> Self {
        Self {
            response: blank_to_none(self.response),
            status: blank_to_none(self.status),
            priority: blank_to_none(self.priority),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateHelpRequest {
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// A help request whose required fields have all been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHelpRequest {
    pub request_type: String,
    pub subject: String,
    pub message: String,
}

impl CreateHelpRequest {
    pub fn validate(self) -> AppResult<NewHelpRequest> {
        match (
            blank_to_none(self.request_type),
            blank_to_none(self.subject),
            blank_to_none(self.message),
        ) {
            (Some(request_type), Some(subject), Some(message)) => Ok(NewHelpRequest {
                request_type,
                subject,
                message,
            }),
            _ => Err(AppError::validation("Missing required fields")),
        }
    }
}

// --- Analytics (admin) ---

/// DashboardCounts
///
/// Raw counters gathered by the repository for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardCounts {
    pub total_users: i64,
    pub active_today: i64,
    pub premium_users: i64,
    pub total_conversations: i64,
    pub total_messages: i64,
    pub messages_today: i64,
    pub this_month_users: i64,
    pub last_month_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserStats {
    pub total: i64,
    pub active_today: i64,
    pub premium: i64,
    pub growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ConversationStats {
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct MessageStats {
    pub total: i64,
    pub today: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub users: UserStats,
    pub conversations: ConversationStats,
    pub messages: MessageStats,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

impl DashboardStats {
    pub fn from_counts(counts: &DashboardCounts, now: DateTime<Utc>) -> Self {
        Self {
            users: UserStats {
                total: counts.total_users,
                active_today: counts.active_today,
                premium: counts.premium_users,
                growth: growth_percent(counts.this_month_users, counts.last_month_users),
            },
            conversations: ConversationStats {
                total: counts.total_conversations,
            },
            messages: MessageStats {
                total: counts.total_messages,
                today: counts.messages_today,
            },
            timestamp: now,
        }
    }
}

/// growth_percent
///
/// Month-over-month sign-up growth, rounded to one decimal. With no sign-ups last month the
/// growth is 100 if there are any this month, and 0 otherwise.
pub fn growth_percent(this_month: i64, last_month: i64) -> f64 {
    if last_month > 0 {
        let growth = (this_month - last_month) as f64 / last_month as f64 * 100.0;
        (growth * 10.0).round() / 10.0
    } else if this_month > 0 {
        100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsRange {
    #[serde(rename = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl AnalyticsRange {
    pub const DEFAULT_DAYS: i64 = 30;

    /// Resolves the requested window against `today`: the default is the last 30 days and
    /// the end is never later than today.
    pub fn resolve(&self, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
        let end = self.end_date.unwrap_or(today).min(today);
        let start = self
            .start_date
            .unwrap_or(today - Duration::days(Self::DEFAULT_DAYS));
        if start > end {
            return Err(AppError::validation("startDate must not be after endDate"));
        }
        Ok((start, end))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct UsagePoint {
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub usage: i64,
    pub tokens: i64,
    pub errors: i64,
    pub users: i64,
}

/// HealthMetrics
///
/// Database-side inputs of the system health report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthMetrics {
    pub db_connected: bool,
    pub avg_temperature: Option<f64>,
    pub total_chats: i64,
    pub total_users: i64,
    pub chats_24h: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SystemHealth {
    pub uptime: String,
    pub avg_temp: String,
    pub api_status: String,
    pub db_status: String,
    pub total_chats: i64,
    pub total_users: i64,
    #[serde(rename = "chats24h")]
    pub chats_24h: i64,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

impl SystemHealth {
    pub const DEFAULT_TEMPERATURE: f64 = 0.65;

    pub fn new(metrics: &HealthMetrics, backend_online: bool, now: DateTime<Utc>) -> Self {
        Self {
            uptime: "99.9%".to_string(),
            avg_temp: format!(
                "{:.2}",
                metrics.avg_temperature.unwrap_or(Self::DEFAULT_TEMPERATURE)
            ),
            api_status: if backend_online { "online" } else { "offline" }.to_string(),
            db_status: if metrics.db_connected {
                "connected"
            } else {
                "disconnected"
            }
            .to_string(),
            total_chats: metrics.total_chats,
            total_users: metrics.total_users,
            chats_24h: metrics.chats_24h,
            timestamp: now,
        }
    }
}

// --- End-user dashboard ---

/// Profile
///
/// The signed-in user's own account data, joined from `auth_users` and `profiles`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: String,
    pub wallet_address: Option<String>,
    pub is_premium: bool,
    pub plan: Option<String>,
    #[ts(type = "string | null")]
    pub plan_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileResponse {
    pub user: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> AppResult<Self> {
        let update = Self {
            name: blank_to_none(self.name),
            nickname: blank_to_none(self.nickname),
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
        };
        if update.name.is_none() && update.nickname.is_none() && update.email.is_none() {
            return Err(AppError::validation("No data provided"));
        }
        Ok(update)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WalletRequest {
    pub wallet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct WalletResponse {
    pub wallet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct WalletSaved {
    pub success: bool,
    pub wallet: String,
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// validate_wallet_address
///
/// Checks that a value has the shape of a Solana public key: 32 to 44 base58 characters.
/// Whether the account exists on chain is not checked here.
pub fn validate_wallet_address(raw: Option<String>) -> AppResult<String> {
    let wallet = blank_to_none(raw).ok_or_else(|| AppError::validation("Wallet not provided"))?;
    let well_formed = (32..=44).contains(&wallet.len())
        && wallet.chars().all(|c| BASE58_ALPHABET.contains(c));
    if !well_formed {
        return Err(AppError::validation("Invalid wallet address"));
    }
    Ok(wallet)
}

// --- Registration & session ---

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint. The password is only forwarded to
/// Supabase Auth and is never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: RegisteredUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SessionInfo {
    pub id: Uuid,
    pub email: String,
    pub role: RoleLevel,
    pub role_level: i32,
}

/// TokenResponse
///
/// The bearer capability for backend calls. By convention it is the user's email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct AdminWelcome {
    pub message: String,
    pub email: String,
    pub role: i32,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}
