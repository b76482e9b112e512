#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use chrono::{NaiveDate, Utc};
use dao_portal::{
    AppState, create_router,
    backend::{BackendState, MockBackendService},
    config::AppConfig,
    models::{
        AdminLogEntry, ChatFilter, ChatMessage, ChatSummary, DashboardCounts, HealthMetrics,
        HelpRequest, HelpRequestFilter, HelpRequestUpdate, Identity, NewHelpRequest, NewUser,
        Page, PageRequest, Profile, UpdateProfileRequest, UpdateUserRequest, UsagePoint,
        UserFilter, UserRow, UserSummary,
    },
    repository::{RepoResult, Repository, RepositoryState},
    role::RoleLevel,
    route_table::RouteTable,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

// --- In-memory repository ---

#[derive(Debug, Clone)]
pub struct Account {
    pub identity: Identity,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub wallet: Option<String>,
}

/// MockRepository
///
/// In-memory `Repository` used by every router and handler test. `lookups` counts
/// session lookups, `handler_calls` counts every other method, so tests can assert that
/// a denied request never reached a handler. With `fail` set every method errors.
#[derive(Default)]
pub struct MockRepository {
    pub accounts: Mutex<HashMap<Uuid, Account>>,
    pub help_requests: Mutex<Vec<HelpRequest>>,
    pub admin_logs: Mutex<Vec<AdminLogEntry>>,
    pub chats: Vec<ChatSummary>,
    pub messages: HashMap<i32, Vec<ChatMessage>>,
    pub counts: DashboardCounts,
    pub usage: Vec<UsagePoint>,
    pub fail: bool,
    /// Makes every admin-log write fail; the audited change is rolled back with it.
    pub fail_audit: bool,
    pub lookups: AtomicUsize,
    pub handler_calls: AtomicUsize,
}

fn db_fault() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Adds an account and returns its identity.
    pub fn add_account(&self, email: &str, role: Option<i32>) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            user_role: role,
            status: Some("active".to_string()),
        };
        self.accounts.lock().unwrap().insert(
            identity.id,
            Account {
                identity: identity.clone(),
                name: Some("Test User".to_string()),
                nickname: None,
                wallet: None,
            },
        );
        identity
    }

    pub fn account(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn handler_call_count(&self) -> usize {
        self.handler_calls.load(Ordering::SeqCst)
    }

    fn audit(&self, entry: AdminLogEntry) -> RepoResult<()> {
        if self.fail_audit {
            return Err(db_fault());
        }
        self.admin_logs.lock().unwrap().push(entry);
        Ok(())
    }

    fn enter(&self) -> RepoResult<()> {
        self.handler_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail { Err(db_fault()) } else { Ok(()) }
    }

    fn summary(account: &Account) -> UserSummary {
        UserSummary::from(UserRow {
            id: account.identity.id,
            name: account.name.clone(),
            email: account.identity.email.clone(),
            user_role: account.identity.user_role,
            is_premium: Some(false),
            status: account.identity.status.clone(),
            last_login: None,
            created_at: Utc::now(),
        })
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let data = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page::new(data, total, page)
}

#[async_trait]
impl Repository for MockRepository {
    async fn find_identity_by_email(&self, email: &str) -> RepoResult<Option<Identity>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(db_fault());
        }
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.identity.email == email)
            .map(|a| a.identity.clone()))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<Uuid> {
        self.enter()?;
        let identity = Identity {
            id: user.supabase_id,
            email: user.email,
            user_role: Some(RoleLevel::User.level()),
            status: Some("active".to_string()),
        };
        self.accounts.lock().unwrap().insert(
            identity.id,
            Account {
                identity: identity.clone(),
                name: user.name,
                nickname: user.nickname,
                wallet: None,
            },
        );
        Ok(identity.id)
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> RepoResult<Page<UserSummary>> {
        self.enter()?;
        let users = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .map(Self::summary)
            .filter(|u| filter.role_level().is_none_or(|role| u.role == role))
            .filter(|u| filter.status_filter().is_none_or(|status| u.status == status))
            .collect();
        Ok(paginate(users, page))
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserSummary>> {
        self.enter()?;
        Ok(self.account(id).as_ref().map(Self::summary))
    }

    async fn update_user(&self, id: Uuid, update: UpdateUserRequest) -> RepoResult<bool> {
        self.enter()?;
        let update = update.normalized();
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(name) = update.name {
            account.name = Some(name);
        }
        if let Some(email) = update.email {
            account.identity.email = email;
        }
        if let Some(status) = update.status {
            account.identity.status = Some(status);
        }
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        self.enter()?;
        Ok(self.accounts.lock().unwrap().remove(&id).is_some())
    }

    async fn ban_user(&self, id: Uuid, audit: AdminLogEntry) -> RepoResult<bool> {
        self.enter()?;
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        self.audit(audit)?;
        account.identity.status = Some("banned".to_string());
        Ok(true)
    }

    async fn set_user_role(
        &self,
        id: Uuid,
        role: RoleLevel,
        audit: AdminLogEntry,
    ) -> RepoResult<bool> {
        self.enter()?;
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };
        self.audit(audit)?;
        account.identity.user_role = Some(role.level());
        Ok(true)
    }

    async fn list_chats(
        &self,
        filter: &ChatFilter,
        page: PageRequest,
    ) -> RepoResult<Page<ChatSummary>> {
        self.enter()?;
        let chats = self
            .chats
            .iter()
            .filter(|c| filter.user_id.is_none_or(|id| c.user_id == Some(id)))
            .cloned()
            .collect();
        Ok(paginate(chats, page))
    }

    async fn get_chat(&self, id: i32) -> RepoResult<Option<ChatSummary>> {
        self.enter()?;
        Ok(self.chats.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_chat(&self, id: i32) -> RepoResult<bool> {
        self.enter()?;
        Ok(self.chats.iter().any(|c| c.id == id))
    }

    async fn list_chat_messages(
        &self,
        chat_id: i32,
        page: PageRequest,
    ) -> RepoResult<Option<Page<ChatMessage>>> {
        self.enter()?;
        if !self.chats.iter().any(|c| c.id == chat_id) {
            return Ok(None);
        }
        let messages = self.messages.get(&chat_id).cloned().unwrap_or_default();
        Ok(Some(paginate(messages, page)))
    }

    async fn list_help_requests(
        &self,
        filter: &HelpRequestFilter,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>> {
        self.enter()?;
        let requests = self
            .help_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.status.as_ref().is_none_or(|s| &r.status == s))
            .cloned()
            .collect();
        Ok(paginate(requests, page))
    }

    async fn get_help_request(&self, id: i64) -> RepoResult<Option<HelpRequest>> {
        self.enter()?;
        Ok(self
            .help_requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn update_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
    ) -> RepoResult<Option<HelpRequest>> {
        self.enter()?;
        let update = update.normalized();
        let mut requests = self.help_requests.lock().unwrap();
        let Some(request) = requests.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(response) = update.response {
            request.response = Some(response);
        }
        if let Some(status) = update.status {
            request.status = status;
        }
        if let Some(priority) = update.priority {
            request.priority = priority;
        }
        request.updated_at = Some(Utc::now());
        Ok(Some(request.clone()))
    }

    async fn answer_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
        audit: AdminLogEntry,
    ) -> RepoResult<Option<HelpRequest>> {
        self.enter()?;
        if !self.help_requests.lock().unwrap().iter().any(|r| r.id == id) {
            return Ok(None);
        }
        self.audit(audit)?;
        self.update_help_request(id, update).await
    }

    async fn delete_help_request(&self, id: i64) -> RepoResult<bool> {
        self.enter()?;
        let mut requests = self.help_requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|r| r.id != id);
        Ok(requests.len() < before)
    }

    async fn create_help_request(
        &self,
        owner: &Identity,
        request: NewHelpRequest,
    ) -> RepoResult<HelpRequest> {
        self.enter()?;
        let mut requests = self.help_requests.lock().unwrap();
        let created = HelpRequest {
            id: requests.len() as i64 + 1,
            user_id: Some(owner.id),
            user_name: None,
            email: owner.email.clone(),
            request_type: request.request_type,
            subject: request.subject,
            message: request.message,
            status: "pending".to_string(),
            priority: "normal".to_string(),
            response: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        requests.push(created.clone());
        Ok(created)
    }

    async fn list_user_help_requests(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>> {
        self.enter()?;
        let requests = self
            .help_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(paginate(requests, page))
    }

    async fn dashboard_counts(&self) -> RepoResult<DashboardCounts> {
        self.enter()?;
        Ok(self.counts.clone())
    }

    async fn usage_series(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<UsagePoint>> {
        self.enter()?;
        Ok(self
            .usage
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect())
    }

    async fn health_metrics(&self) -> RepoResult<HealthMetrics> {
        self.enter()?;
        Ok(HealthMetrics {
            db_connected: true,
            avg_temperature: None,
            total_chats: self.chats.len() as i64,
            total_users: self.accounts.lock().unwrap().len() as i64,
            chats_24h: 0,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        self.enter()?;
        Ok(self.account(user_id).map(|a| Profile {
            id: a.identity.id,
            name: a.name,
            nickname: a.nickname,
            email: a.identity.email,
            wallet_address: a.wallet,
            is_premium: false,
            plan: Some("free".to_string()),
            plan_expiry: None,
        }))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> RepoResult<bool> {
        self.enter()?;
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.get_mut(&user_id) else {
            return Ok(false);
        };
        if let Some(name) = update.name {
            account.name = Some(name);
        }
        if let Some(nickname) = update.nickname {
            account.nickname = Some(nickname);
        }
        if let Some(email) = update.email {
            account.identity.email = email;
        }
        Ok(true)
    }

    async fn get_wallet(&self, user_id: Uuid) -> RepoResult<Option<String>> {
        self.enter()?;
        Ok(self.account(user_id).and_then(|a| a.wallet))
    }

    async fn set_wallet(&self, user_id: Uuid, wallet: &str) -> RepoResult<bool> {
        self.enter()?;
        let mut accounts = self.accounts.lock().unwrap();
        Ok(match accounts.get_mut(&user_id) {
            Some(account) => {
                account.wallet = Some(wallet.to_string());
                true
            }
            None => false,
        })
    }

    async fn delete_account(&self, user_id: Uuid) -> RepoResult<bool> {
        self.enter()?;
        Ok(self.accounts.lock().unwrap().remove(&user_id).is_some())
    }
}

// --- App wiring ---

pub fn state_with(
    repo: Arc<MockRepository>,
    backend: MockBackendService,
    config: AppConfig,
) -> AppState {
    let routes = RouteTable::standard().with_unmatched(config.route_default_deny.then_some(RoleLevel::User));
    AppState {
        repo: repo as RepositoryState,
        backend: Arc::new(backend) as BackendState,
        config,
        routes: Arc::new(routes),
    }
}

pub fn test_state(repo: Arc<MockRepository>) -> AppState {
    state_with(repo, MockBackendService::new(), AppConfig::default())
}

pub fn test_app(repo: Arc<MockRepository>) -> Router {
    create_router(test_state(repo))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("location")
            .and_then(|value| value.to_str().ok())
    }
}

/// Sends one request through the router and decodes the JSON body (`Null` if none).
pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
}
