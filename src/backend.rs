use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;

/// BackendError
///
/// Failures of the external HTTP services: the chat/payment backend and Supabase Auth.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status. `message` is the service's own
    /// `detail`/`error` text when it sent one.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

// --- Wire models ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageAllowance {
    pub used: Option<i64>,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

/// BackendRateLimit
///
/// The raw `/rate-limit/check` payload. The backend is the source of truth for the
/// counters; only the tier label is normalized here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendRateLimit {
    pub tier: Option<String>,
    pub messages: Option<MessageAllowance>,
    pub reset_at: Option<String>,
}

/// RateLimitStatus
///
/// The rate-limit view returned to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RateLimitStatus {
    pub user_id: String,
    pub tier: String,
    pub current_count: i64,
    pub limit: i64,
    pub remaining: i64,
    pub reset_time: String,
    pub allowed: bool,
}

const FREE_TIER: &str = "free";

/// normalize_tier
///
/// Lowercases a backend tier label and folds legacy aliases: `premium` (and its common
/// misspelling), `tier2` and `tier_2` become `elite`; `tier1` and `tier_1` become `pro`.
/// A missing tier is `free`.
pub fn normalize_tier(tier: Option<&str>) -> String {
    let Some(tier) = tier.map(str::trim).filter(|t| !t.is_empty()) else {
        return FREE_TIER.to_string();
    };
    let lowered = tier.to_lowercase();
    match lowered.as_str() {
        "premium" | "premuim" | "tier2" | "tier_2" => "elite".to_string(),
        "tier1" | "tier_1" => "pro".to_string(),
        _ => lowered,
    }
}

/// Daily message limit per normalized tier. Unknown tiers get the free allowance.
pub fn tier_limit(tier: &str) -> i64 {
    match tier {
        "pro" => 10,
        "elite" => 20,
        _ => 5,
    }
}

fn default_reset(now: DateTime<Utc>) -> String {
    (now + Duration::hours(24)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RateLimitStatus {
    /// Builds the dashboard view from the backend payload, filling gaps from the tier table.
    pub fn from_backend(user_id: &str, data: BackendRateLimit, now: DateTime<Utc>) -> Self {
        let tier = normalize_tier(data.tier.as_deref());
        let messages = data.messages.unwrap_or_default();
        let current_count = messages.used.unwrap_or(0);
        let limit = messages.limit.unwrap_or_else(|| tier_limit(&tier));
        let remaining = messages
            .remaining
            .unwrap_or_else(|| (limit - current_count).max(0));

        Self {
            user_id: user_id.to_string(),
            tier,
            current_count,
            limit,
            remaining,
            reset_time: data.reset_at.unwrap_or_else(|| default_reset(now)),
            allowed: remaining > 0,
        }
    }

    /// The free-tier answer used when the backend cannot be reached. Chat stays allowed;
    /// the backend enforces the real limit on its side.
    pub fn fallback(now: DateTime<Utc>) -> Self {
        let limit = tier_limit(FREE_TIER);
        Self {
            user_id: String::new(),
            tier: FREE_TIER.to_string(),
            current_count: 0,
            limit,
            remaining: limit,
            reset_time: default_reset(now),
            allowed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PlanStatus {
    #[serde(default = "free_plan")]
    pub plan: String,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

fn free_plan() -> String {
    FREE_TIER.to_string()
}

impl PlanStatus {
    pub fn free() -> Self {
        Self {
            plan: free_plan(),
            expiry: None,
            is_premium: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpgradeRequest {
    pub plan: Option<String>,
    #[serde(rename = "txSignature")]
    pub tx_signature: Option<String>,
}

/// A validated upgrade: both the plan and the payment transaction signature are present.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpgradeOrder {
    pub plan: String,
    #[serde(rename = "txSignature")]
    pub tx_signature: String,
}

impl UpgradeRequest {
    pub fn validate(self) -> Option<UpgradeOrder> {
        let plan = crate::models::blank_to_none(self.plan)?;
        let tx_signature = crate::models::blank_to_none(self.tx_signature)?;
        Some(UpgradeOrder { plan, tx_signature })
    }
}

/// The backend's answer to an upgrade.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendUpgrade {
    pub plan: Option<String>,
    pub expiry: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UpgradeResponse {
    pub success: bool,
    pub plan: Option<String>,
    pub expiry: Option<String>,
    pub is_premium: bool,
    pub message: Option<String>,
}

impl From<BackendUpgrade> for UpgradeResponse {
    fn from(upgrade: BackendUpgrade) -> Self {
        Self {
            success: true,
            plan: upgrade.plan,
            expiry: upgrade.expiry,
            is_premium: upgrade.is_premium,
            message: upgrade.message,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendCancel {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct CancelResponse {
    pub success: bool,
    pub message: Option<String>,
    pub plan: String,
    pub is_premium: bool,
}

impl From<BackendCancel> for CancelResponse {
    fn from(cancel: BackendCancel) -> Self {
        Self {
            success: true,
            message: cancel.message,
            plan: free_plan(),
            is_premium: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignupResponse {
    id: Option<Uuid>,
    user: Option<SignupUser>,
}

#[derive(Debug, Deserialize)]
struct SignupUser {
    id: Uuid,
}

// --- Service contract ---

/// BackendService
///
/// The external HTTP services the portal depends on. Every per-user call carries the
/// user's bearer capability (their email). Handlers only see this trait, so tests run
/// against [`MockBackendService`].
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn rate_limit(&self, token: &str) -> Result<BackendRateLimit, BackendError>;
    async fn plan(&self, token: &str) -> Result<PlanStatus, BackendError>;
    async fn upgrade(
        &self,
        token: &str,
        order: &UpgradeOrder,
    ) -> Result<BackendUpgrade, BackendError>;
    async fn cancel(&self, token: &str) -> Result<BackendCancel, BackendError>;
    /// Liveness of the chat backend. Never fails; an unreachable backend is `false`.
    async fn ping(&self) -> bool;
    /// Creates the account in Supabase Auth and returns its id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, BackendError>;
}

pub type BackendState = Arc<dyn BackendService>;

/// HttpBackendClient
///
/// `BackendService` over `reqwest`. One client (and its connection pool) is built at
/// startup and shared.
#[derive(Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    supabase_url: Option<String>,
    supabase_key: Option<String>,
}

impl HttpBackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.backend_url.clone(),
            supabase_url: config.supabase_url.clone(),
            supabase_key: config.supabase_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes a success body, or turns an error status into
    /// `BackendError::Rejected` carrying the service's message.
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let message = ["detail", "error", "msg", "error_description"]
                .iter()
                .find_map(|key| body.get(key).and_then(Value::as_str))
                .unwrap_or("Backend request failed")
                .to_string();
            tracing::warn!(status = status.as_u16(), %message, "backend rejected request");
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BackendService for HttpBackendClient {
    async fn rate_limit(&self, token: &str) -> Result<BackendRateLimit, BackendError> {
        Self::send(
            self.client
                .get(self.url("/rate-limit/check"))
                .bearer_auth(token),
        )
        .await
    }

    async fn plan(&self, token: &str) -> Result<PlanStatus, BackendError> {
        Self::send(self.client.get(self.url("/upgrade/plan")).bearer_auth(token)).await
    }

    async fn upgrade(
        &self,
        token: &str,
        order: &UpgradeOrder,
    ) -> Result<BackendUpgrade, BackendError> {
        Self::send(
            self.client
                .post(self.url("/upgrade/upgrade"))
                .bearer_auth(token)
                .json(order),
        )
        .await
    }

    async fn cancel(&self, token: &str) -> Result<BackendCancel, BackendError> {
        Self::send(
            self.client
                .post(self.url("/upgrade/cancel"))
                .bearer_auth(token),
        )
        .await
    }

    async fn ping(&self) -> bool {
        match self.client.get(self.url("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "backend health check failed");
                false
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Uuid, BackendError> {
        let (Some(url), Some(key)) = (&self.supabase_url, &self.supabase_key) else {
            return Err(BackendError::Unavailable(
                "Supabase credentials are not configured".to_string(),
            ));
        };

        let response: SignupResponse = Self::send(
            self.client
                .post(format!("{}/auth/v1/signup", url))
                .header("apikey", key)
                .json(&serde_json::json!({ "email": email, "password": password })),
        )
        .await?;

        // Supabase returns the user either at the top level or under `user`, depending on
        // whether email confirmation is enabled.
        response
            .user
            .map(|user| user.id)
            .or(response.id)
            .ok_or_else(|| BackendError::Unavailable("signup returned no user id".to_string()))
    }
}

/// MockBackendService
///
/// Canned responses for tests. `should_fail` makes every call fail at the transport
/// level; `reject` makes every call fail with the given status and message.
#[derive(Clone, Default)]
pub struct MockBackendService {
    pub should_fail: bool,
    pub reject: Option<(u16, String)>,
    pub rate_limit: BackendRateLimit,
    pub plan: Option<PlanStatus>,
    pub online: bool,
    pub calls: Arc<AtomicUsize>,
    pub tokens: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockBackendService {
    pub fn new() -> Self {
        Self {
            online: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens received so far, in call order.
    pub fn seen_tokens(&self) -> Vec<String> {
        self.tokens.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn record(&self, token: &str) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.push(token.to_string());
        }
        if self.should_fail {
            return Err(BackendError::Unavailable("mock backend failure".to_string()));
        }
        if let Some((status, message)) = &self.reject {
            return Err(BackendError::Rejected {
                status: *status,
                message: message.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BackendService for MockBackendService {
    async fn rate_limit(&self, token: &str) -> Result<BackendRateLimit, BackendError> {
        self.record(token)?;
        Ok(self.rate_limit.clone())
    }

    async fn plan(&self, token: &str) -> Result<PlanStatus, BackendError> {
        self.record(token)?;
        Ok(self.plan.clone().unwrap_or_else(PlanStatus::free))
    }

    async fn upgrade(
        &self,
        token: &str,
        order: &UpgradeOrder,
    ) -> Result<BackendUpgrade, BackendError> {
        self.record(token)?;
        Ok(BackendUpgrade {
            plan: Some(order.plan.clone()),
            expiry: Some("2030-01-01T00:00:00Z".to_string()),
            is_premium: true,
            message: Some(format!("Upgraded to {}", order.plan)),
        })
    }

    async fn cancel(&self, token: &str) -> Result<BackendCancel, BackendError> {
        self.record(token)?;
        Ok(BackendCancel {
            message: Some("Subscription cancelled".to_string()),
        })
    }

    async fn ping(&self) -> bool {
        self.online && !self.should_fail
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Uuid, BackendError> {
        self.record(email)?;
        Ok(Uuid::new_v4())
    }
}
