use crate::models::{
    AdminLogEntry, ChatFilter, ChatMessage, ChatRow, ChatSummary, DashboardCounts, HealthMetrics,
    HelpRequest, HelpRequestFilter, HelpRequestUpdate, Identity, NewHelpRequest, NewUser, Page,
    PageRequest, Profile, UpdateProfileRequest, UpdateUserRequest, UsagePoint, UserFilter,
    UserRow, UserSummary,
};
use crate::role::RoleLevel;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract behind every handler and behind session resolution. Handlers
/// only see this trait, so tests substitute an in-memory implementation.
///
/// Every method returns `RepoResult`: a database fault is always distinguishable from an
/// empty result (`None`, `false`, empty page).
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    /// Looks up the account behind a session. `email` is expected in normalized form.
    async fn find_identity_by_email(&self, email: &str) -> RepoResult<Option<Identity>>;
    /// Creates the local account, profile and free subscription for a signed-up user.
    async fn create_user(&self, user: NewUser) -> RepoResult<Uuid>;

    // --- Users (admin) ---
    async fn list_users(&self, filter: &UserFilter, page: PageRequest)
    -> RepoResult<Page<UserSummary>>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserSummary>>;
    async fn update_user(&self, id: Uuid, update: UpdateUserRequest) -> RepoResult<bool>;
    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;
    // Audited mutations: the change and its `admin_logs` row commit together or not at all.
    async fn ban_user(&self, id: Uuid, audit: AdminLogEntry) -> RepoResult<bool>;
    async fn set_user_role(&self, id: Uuid, role: RoleLevel, audit: AdminLogEntry)
    -> RepoResult<bool>;

    // --- Chats (admin) ---
    async fn list_chats(&self, filter: &ChatFilter, page: PageRequest)
    -> RepoResult<Page<ChatSummary>>;
    async fn get_chat(&self, id: i32) -> RepoResult<Option<ChatSummary>>;
    async fn delete_chat(&self, id: i32) -> RepoResult<bool>;
    /// `None` when the chat itself does not exist.
    async fn list_chat_messages(
        &self,
        chat_id: i32,
        page: PageRequest,
    ) -> RepoResult<Option<Page<ChatMessage>>>;

    // --- Help requests ---
    async fn list_help_requests(
        &self,
        filter: &HelpRequestFilter,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>>;
    async fn get_help_request(&self, id: i64) -> RepoResult<Option<HelpRequest>>;
    async fn update_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
    ) -> RepoResult<Option<HelpRequest>>;
    /// `update_help_request` plus its audit row, in one transaction.
    async fn answer_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
        audit: AdminLogEntry,
    ) -> RepoResult<Option<HelpRequest>>;
    async fn delete_help_request(&self, id: i64) -> RepoResult<bool>;
    async fn create_help_request(
        &self,
        owner: &Identity,
        request: NewHelpRequest,
    ) -> RepoResult<HelpRequest>;
    async fn list_user_help_requests(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>>;

    // --- Analytics (admin) ---
    async fn dashboard_counts(&self) -> RepoResult<DashboardCounts>;
    async fn usage_series(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<UsagePoint>>;
    async fn health_metrics(&self) -> RepoResult<HealthMetrics>;

    // --- Own account ---
    async fn get_profile(&self, user_id: Uuid) -> RepoResult<Option<Profile>>;
    async fn update_profile(&self, user_id: Uuid, update: UpdateProfileRequest)
    -> RepoResult<bool>;
    async fn get_wallet(&self, user_id: Uuid) -> RepoResult<Option<String>>;
    async fn set_wallet(&self, user_id: Uuid, wallet: &str) -> RepoResult<bool>;
    /// Removes usage logs, subscriptions and the account in a single transaction.
    async fn delete_account(&self, user_id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer carried by `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by an explicitly constructed `PgPool`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, name, email, user_role, is_premium, status, last_login, created_at";

const HELP_REQUEST_COLUMNS: &str = "id, user_id, user_name, email, type, subject, message, \
     status, priority, response, created_at, updated_at";

// Conversation listing joined with owner display name, message count and first user message.
const CHAT_SELECT: &str = r#"
    SELECT c.id, c.user_id, c.title, c.created_at,
           COALESCE(u.name, u.nickname, u.email) AS user_display,
           (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS messages_count,
           (SELECT m.message_text FROM messages m
             WHERE m.conversation_id = c.id AND m.role = 'user'
             ORDER BY m.created_at ASC LIMIT 1) AS first_message
    FROM conversations c
    LEFT JOIN auth_users u ON u.id = c.user_id
    WHERE 1=1
"#;

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(role) = filter.role_level() {
        // Unset roles count as the default tier, mirroring the role mapper.
        builder.push(" AND COALESCE(user_role, ");
        builder.push_bind(RoleLevel::DEFAULT.level());
        builder.push(") = ");
        builder.push_bind(role.level());
    }
    if let Some(status) = filter.status_filter() {
        builder.push(" AND COALESCE(status, 'active') = ");
        builder.push_bind(status);
    }
    if let Some(search) = filter.search_term() {
        let pattern = format!("%{}%", search);
        builder.push(" AND (email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR name ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_chat_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ChatFilter) {
    if let Some(user_id) = filter.user_id {
        builder.push(" AND c.user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(search) = filter.search_term() {
        builder.push(" AND c.title ILIKE ");
        builder.push_bind(format!("%{}%", search));
    }
}

fn push_help_request_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &HelpRequestFilter) {
    let exact = [
        ("type", &filter.request_type),
        ("status", &filter.status),
        ("priority", &filter.priority),
    ];
    for (column, value) in exact {
        if let Some(value) = crate::models::blank_to_none(value.clone()) {
            builder.push(format!(" AND {} = ", column));
            builder.push_bind(value);
        }
    }
    if let Some(search) = crate::models::blank_to_none(filter.search.clone()) {
        let pattern = format!("%{}%", search);
        builder.push(" AND (subject ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR message ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    builder.push(" LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

async fn count(pool: &PgPool, sql: &str) -> RepoResult<i64> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}

async fn insert_admin_log(conn: &mut PgConnection, entry: AdminLogEntry) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO admin_logs (admin_email, action, target_user_id, reason, created_at) \
         VALUES ($1, $2, $3, $4, NOW())",
    )
    .bind(entry.admin_email)
    .bind(entry.action.as_str())
    .bind(entry.target_user_id)
    .bind(entry.reason)
    .execute(conn)
    .await?;
    Ok(())
}

async fn apply_help_request_update(
    conn: &mut PgConnection,
    id: i64,
    update: HelpRequestUpdate,
) -> RepoResult<Option<HelpRequest>> {
    let update = update.normalized();
    sqlx::query_as::<_, HelpRequest>(&format!(
        r#"
        UPDATE help_requests
           SET response = COALESCE($1, response),
               status = COALESCE($2, status),
               priority = COALESCE($3, priority),
               updated_at = NOW()
         WHERE id = $4
        RETURNING {}
        "#,
        HELP_REQUEST_COLUMNS
    ))
    .bind(update.response)
    .bind(update.status)
    .bind(update.priority)
    .bind(id)
    .fetch_optional(conn)
    .await
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_identity_by_email(&self, email: &str) -> RepoResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>(
            "SELECT id, email, user_role, status FROM auth_users WHERE LOWER(email) = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// create_user
    ///
    /// Upserts the account by email (role 2), then its profile and a free subscription, in
    /// one transaction so a half-registered user never exists.
    async fn create_user(&self, user: NewUser) -> RepoResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO auth_users (id, supabase_id, email, name, nickname, user_role, created_at)
            VALUES ($1, $1, $2, $3, $4, $5, NOW())
            ON CONFLICT (email) DO UPDATE
                SET name = COALESCE(EXCLUDED.name, auth_users.name),
                    nickname = COALESCE(EXCLUDED.nickname, auth_users.nickname),
                    updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(user.supabase_id)
        .bind(user.email.to_lowercase())
        .bind(&user.name)
        .bind(&user.nickname)
        .bind(RoleLevel::User.level())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO profiles (id, updated_at) VALUES ($1, NOW()) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (user_id, plan, status, credits, active, created_at, updated_at)
            SELECT $1, 'free', 'active', 100, true, NOW(), NOW()
            WHERE NOT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// list_users
    ///
    /// Filtered listing built with `QueryBuilder` so every filter value is a bound
    /// parameter. The count query reuses the same filters.
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> RepoResult<Page<UserSummary>> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM auth_users WHERE 1=1");
        push_user_filters(&mut count_query, filter);
        let total = count_query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM auth_users WHERE 1=1", USER_COLUMNS));
        push_user_filters(&mut query, filter);
        query.push(" ORDER BY created_at DESC");
        push_page(&mut query, page);
        let rows = query.build_query_as::<UserRow>().fetch_all(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(UserSummary::from).collect(),
            total,
            page,
        ))
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserSummary>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM auth_users WHERE id = $1 LIMIT 1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserSummary::from))
    }

    async fn update_user(&self, id: Uuid, update: UpdateUserRequest) -> RepoResult<bool> {
        let update = update.normalized();
        let result = sqlx::query(
            r#"
            UPDATE auth_users
               SET name = COALESCE($1, name),
                   email = COALESCE($2, email),
                   status = COALESCE($3, status),
                   updated_at = NOW()
             WHERE id = $4
            "#,
        )
        .bind(update.name)
        .bind(update.email)
        .bind(update.status)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM auth_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ban_user(&self, id: Uuid, audit: AdminLogEntry) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let banned =
            sqlx::query("UPDATE auth_users SET status = 'banned', updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if banned == 0 {
            return Ok(false);
        }

        insert_admin_log(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn set_user_role(
        &self,
        id: Uuid,
        role: RoleLevel,
        audit: AdminLogEntry,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated =
            sqlx::query("UPDATE auth_users SET user_role = $1, updated_at = NOW() WHERE id = $2")
                .bind(role.level())
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if updated == 0 {
            return Ok(false);
        }

        insert_admin_log(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn list_chats(
        &self,
        filter: &ChatFilter,
        page: PageRequest,
    ) -> RepoResult<Page<ChatSummary>> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM conversations c WHERE 1=1");
        push_chat_filters(&mut count_query, filter);
        let total = count_query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(CHAT_SELECT);
        push_chat_filters(&mut query, filter);
        query.push(" ORDER BY c.created_at DESC");
        push_page(&mut query, page);
        let rows = query.build_query_as::<ChatRow>().fetch_all(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(ChatSummary::from).collect(),
            total,
            page,
        ))
    }

    async fn get_chat(&self, id: i32) -> RepoResult<Option<ChatSummary>> {
        let mut query = QueryBuilder::<Postgres>::new(CHAT_SELECT);
        query.push(" AND c.id = ");
        query.push_bind(id);
        let row = query
            .build_query_as::<ChatRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ChatSummary::from))
    }

    async fn delete_chat(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_chat_messages(
        &self,
        chat_id: i32,
        page: PageRequest,
    ) -> RepoResult<Option<Page<ChatMessage>>> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM conversations WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(chat_id)
                .fetch_one(&self.pool)
                .await?;

        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id,
                   COALESCE(role, 'user') AS sender,
                   COALESCE(message_text, '') AS text,
                   created_at AS timestamp
              FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Page::new(messages, total, page)))
    }

    async fn list_help_requests(
        &self,
        filter: &HelpRequestFilter,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM help_requests WHERE 1=1");
        push_help_request_filters(&mut count_query, filter);
        let total = count_query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM help_requests WHERE 1=1",
            HELP_REQUEST_COLUMNS
        ));
        push_help_request_filters(&mut query, filter);
        query.push(" ORDER BY priority DESC, created_at DESC");
        push_page(&mut query, page);
        let rows = query
            .build_query_as::<HelpRequest>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(rows, total, page))
    }

    async fn get_help_request(&self, id: i64) -> RepoResult<Option<HelpRequest>> {
        sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {} FROM help_requests WHERE id = $1",
            HELP_REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
    ) -> RepoResult<Option<HelpRequest>> {
        let mut conn = self.pool.acquire().await?;
        apply_help_request_update(&mut *conn, id, update).await
    }

    async fn answer_help_request(
        &self,
        id: i64,
        update: HelpRequestUpdate,
        audit: AdminLogEntry,
    ) -> RepoResult<Option<HelpRequest>> {
        let mut tx = self.pool.begin().await?;

        let Some(updated) = apply_help_request_update(&mut *tx, id, update).await? else {
            return Ok(None);
        };

        insert_admin_log(&mut *tx, audit).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_help_request(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM help_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_help_request(
        &self,
        owner: &Identity,
        request: NewHelpRequest,
    ) -> RepoResult<HelpRequest> {
        sqlx::query_as::<_, HelpRequest>(&format!(
            r#"
            INSERT INTO help_requests (user_id, user_name, email, type, subject, message)
            SELECT $1, u.name, $2, $3, $4, $5 FROM auth_users u WHERE u.id = $1
            RETURNING {}
            "#,
            HELP_REQUEST_COLUMNS
        ))
        .bind(owner.id)
        .bind(&owner.email)
        .bind(request.request_type)
        .bind(request.subject)
        .bind(request.message)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_user_help_requests(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> RepoResult<Page<HelpRequest>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM help_requests WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {} FROM help_requests WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            HELP_REQUEST_COLUMNS
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(rows, total, page))
    }

    async fn dashboard_counts(&self) -> RepoResult<DashboardCounts> {
        let pool = &self.pool;
        Ok(DashboardCounts {
            total_users: count(pool, "SELECT COUNT(*) FROM auth_users WHERE active = true").await?,
            active_today: count(
                pool,
                "SELECT COUNT(DISTINCT user_id) FROM messages WHERE DATE(created_at) = CURRENT_DATE",
            )
            .await?,
            premium_users: count(pool, "SELECT COUNT(*) FROM auth_users WHERE is_premium = true")
                .await?,
            total_conversations: count(pool, "SELECT COUNT(*) FROM conversations").await?,
            total_messages: count(pool, "SELECT COUNT(*) FROM messages").await?,
            messages_today: count(
                pool,
                "SELECT COUNT(*) FROM messages WHERE DATE(created_at) = CURRENT_DATE",
            )
            .await?,
            this_month_users: count(
                pool,
                "SELECT COUNT(*) FROM auth_users \
                 WHERE DATE_TRUNC('month', created_at) = DATE_TRUNC('month', CURRENT_DATE)",
            )
            .await?,
            last_month_users: count(
                pool,
                "SELECT COUNT(*) FROM auth_users \
                 WHERE DATE_TRUNC('month', created_at) = \
                       DATE_TRUNC('month', CURRENT_DATE - INTERVAL '1 month')",
            )
            .await?,
        })
    }

    async fn usage_series(&self, start: NaiveDate, end: NaiveDate) -> RepoResult<Vec<UsagePoint>> {
        sqlx::query_as::<_, UsagePoint>(
            r#"
            SELECT DATE(created_at) AS date,
                   COUNT(DISTINCT id) AS usage,
                   0::BIGINT AS tokens,
                   0::BIGINT AS errors,
                   COUNT(DISTINCT user_id) AS users
              FROM conversations
             WHERE created_at >= $1::date
               AND created_at < $2::date + INTERVAL '1 day'
               AND created_at <= NOW()
             GROUP BY DATE(created_at)
             ORDER BY DATE(created_at) ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
    }

    /// health_metrics
    ///
    /// The temperature average is optional: older schemas have no `temperature` column, in
    /// which case the report falls back to the default.
    async fn health_metrics(&self) -> RepoResult<HealthMetrics> {
        sqlx::query("SELECT NOW()").execute(&self.pool).await?;

        let has_temperature: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
             WHERE table_name = 'conversations' AND column_name = 'temperature')",
        )
        .fetch_one(&self.pool)
        .await?;

        let avg_temperature = if has_temperature {
            sqlx::query_scalar::<_, Option<f64>>(
                "SELECT AVG(COALESCE(temperature, 0.65))::DOUBLE PRECISION FROM conversations \
                 WHERE created_at > NOW() - INTERVAL '7 days'",
            )
            .fetch_one(&self.pool)
            .await?
        } else {
            tracing::debug!("conversations.temperature missing; using default temperature");
            None
        };

        let (total_chats, total_users, chats_24h): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT id),
                   COUNT(DISTINCT user_id),
                   COUNT(*) FILTER (WHERE created_at > NOW() - INTERVAL '24 hours')
              FROM conversations
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(HealthMetrics {
            db_connected: true,
            avg_temperature,
            total_chats,
            total_users,
            chats_24h,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT u.id, u.name, u.nickname, u.email,
                   p.wallet_address,
                   COALESCE(u.is_premium, false) AS is_premium,
                   p.plan, p.plan_expiry
              FROM auth_users u
              LEFT JOIN profiles p ON p.id = u.id
             WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE auth_users
               SET name = COALESCE($1, name),
                   nickname = COALESCE($2, nickname),
                   email = COALESCE($3, email),
                   updated_at = NOW()
             WHERE id = $4
            "#,
        )
        .bind(update.name)
        .bind(update.nickname)
        .bind(update.email)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_wallet(&self, user_id: Uuid) -> RepoResult<Option<String>> {
        let wallet: Option<Option<String>> =
            sqlx::query_scalar("SELECT wallet_address FROM profiles WHERE id = $1 LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(wallet.flatten())
    }

    async fn set_wallet(&self, user_id: Uuid, wallet: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (id, wallet_address, updated_at)
            SELECT id, $2, NOW() FROM auth_users WHERE id = $1
            ON CONFLICT (id) DO UPDATE
                SET wallet_address = EXCLUDED.wallet_address, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(wallet)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, user_id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM usage_logs WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM auth_users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}
