//! Repository tests against a live Postgres. Run with
//! `DATABASE_URL=... cargo test --test repository_integration_tests -- --ignored`.

use chrono::Utc;
use dao_portal::{
    models::{
        AdminAction, AdminLogEntry, ChatFilter, HelpRequestFilter, HelpRequestUpdate, NewUser,
        PageRequest, UpdateProfileRequest, UserFilter,
    },
    repository::{PostgresRepository, Repository},
    role::RoleLevel,
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn unique_email(tag: &str) -> String {
    format!("{}-{}@test.com", tag, Uuid::new_v4().simple())
}

async fn register(repo: &PostgresRepository, email: &str) -> Uuid {
    repo.create_user(NewUser {
        supabase_id: Uuid::new_v4(),
        email: email.to_string(),
        name: Some("Test User".to_string()),
        nickname: None,
    })
    .await
    .expect("Failed to create test user")
}

async fn create_chat(pool: &PgPool, user_id: Uuid, messages: &[&str]) -> i32 {
    let chat_id: i32 = sqlx::query_scalar(
        "INSERT INTO conversations (user_id, title, temperature) VALUES ($1, NULL, 0.8) RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("Failed to create conversation");

    for text in messages {
        sqlx::query(
            "INSERT INTO messages (conversation_id, user_id, role, message_text) VALUES ($1, $2, 'user', $3)",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(text)
        .execute(pool)
        .await
        .expect("Failed to create message");
    }
    chat_id
}

// --- Accounts ---

#[tokio::test]
#[ignore]
async fn test_registration_creates_account_profile_and_subscription() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("register");

    let id = register(&repo, &email).await;

    let identity = repo
        .find_identity_by_email(&email)
        .await
        .unwrap()
        .expect("registered identity should be found");
    assert_eq!(identity.id, id);
    assert_eq!(identity.role_level(), RoleLevel::User);

    let profile = repo.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.email, email);
    assert_eq!(profile.name.as_deref(), Some("Test User"));

    let subscriptions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
            .bind(id)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert_eq!(subscriptions, 1);

    // Registering the same email again keeps the existing account.
    let again = register(&repo, &email).await;
    assert_eq!(again, id);
}

#[tokio::test]
#[ignore]
async fn test_unknown_email_has_no_identity() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let identity = repo
        .find_identity_by_email(&unique_email("nobody"))
        .await
        .unwrap();
    assert!(identity.is_none());
}

#[tokio::test]
#[ignore]
async fn test_role_change_ban_and_audit() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("promote");
    let id = register(&repo, &email).await;

    let audit = |action| AdminLogEntry {
        admin_email: "admin@test.com".to_string(),
        action,
        target_user_id: Some(id),
        reason: Some("spam".to_string()),
    };

    assert!(
        repo.set_user_role(id, RoleLevel::Contributor, audit(AdminAction::PromoteUser))
            .await
            .unwrap()
    );
    assert!(repo.ban_user(id, audit(AdminAction::BanUser)).await.unwrap());

    let user = repo.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.role, RoleLevel::Contributor);
    assert_eq!(user.status, "banned");

    let logged: Vec<String> = sqlx::query_scalar(
        "SELECT action FROM admin_logs WHERE target_user_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(logged, vec!["promote_user", "ban_user"]);

    // A missing target rolls back without writing an audit row.
    let ghost = Uuid::new_v4();
    let missing = AdminLogEntry {
        target_user_id: Some(ghost),
        ..audit(AdminAction::BanUser)
    };
    assert!(!repo.ban_user(ghost, missing).await.unwrap());
    let ghost_logs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM admin_logs WHERE target_user_id = $1")
            .bind(ghost)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert_eq!(ghost_logs, 0);
}

#[tokio::test]
#[ignore]
async fn test_list_users_filters_by_search() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("searchable");
    register(&repo, &email).await;

    let filter = UserFilter {
        search: Some(email.clone()),
        ..UserFilter::default()
    };
    let page = repo
        .list_users(&filter, filter.page_request())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].email, email);
    assert!(!page.has_more);
}

#[tokio::test]
#[ignore]
async fn test_profile_and_wallet_updates() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let id = register(&repo, &unique_email("profile")).await;

    let updated = repo
        .update_profile(
            id,
            UpdateProfileRequest {
                nickname: Some("neo".to_string()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let wallet = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    assert!(repo.set_wallet(id, wallet).await.unwrap());
    assert_eq!(repo.get_wallet(id).await.unwrap().as_deref(), Some(wallet));

    let profile = repo.get_profile(id).await.unwrap().unwrap();
    assert_eq!(profile.nickname.as_deref(), Some("neo"));
    assert_eq!(profile.wallet_address.as_deref(), Some(wallet));
}

#[tokio::test]
#[ignore]
async fn test_delete_account_removes_dependent_rows() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("delete");
    let id = register(&repo, &email).await;

    sqlx::query("INSERT INTO usage_logs (user_id) VALUES ($1)")
        .bind(id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    assert!(repo.delete_account(id).await.unwrap());
    assert!(repo.find_identity_by_email(&email).await.unwrap().is_none());

    let usage: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_logs WHERE user_id = $1")
        .bind(id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(usage, 0);

    assert!(!repo.delete_account(id).await.unwrap());
}

// --- Chats ---

#[tokio::test]
#[ignore]
async fn test_chat_listing_and_messages() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = register(&repo, &unique_email("chatter")).await;
    let chat_id = create_chat(&ctx.pool, owner, &["How do I vote?", "Thanks"]).await;

    let chat = repo.get_chat(chat_id).await.unwrap().unwrap();
    assert_eq!(chat.title, "How do I vote?");
    assert_eq!(chat.messages_count, 2);
    assert_eq!(chat.user, "Test User");

    let filter = ChatFilter {
        user_id: Some(owner),
        ..ChatFilter::default()
    };
    let chats = repo.list_chats(&filter, filter.page_request()).await.unwrap();
    assert_eq!(chats.total, 1);

    let messages = repo
        .list_chat_messages(chat_id, PageRequest::new(None, None, PageRequest::MESSAGES_LIMIT))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(messages.total, 2);
    assert_eq!(messages.data[0].text, "How do I vote?");
    assert_eq!(messages.data[0].sender, "user");

    assert!(repo.delete_chat(chat_id).await.unwrap());
    assert!(repo.get_chat(chat_id).await.unwrap().is_none());
    assert!(
        repo.list_chat_messages(chat_id, PageRequest::default())
            .await
            .unwrap()
            .is_none()
    );
}

// --- Help requests ---

#[tokio::test]
#[ignore]
async fn test_help_request_lifecycle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("helpme");
    let id = register(&repo, &email).await;
    let owner = repo.find_identity_by_email(&email).await.unwrap().unwrap();
    let subject = format!("Refund {}", Uuid::new_v4().simple());

    let created = repo
        .create_help_request(
            &owner,
            dao_portal::models::NewHelpRequest {
                request_type: "billing".to_string(),
                subject: subject.clone(),
                message: "Charged twice".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.status, "pending");
    assert_eq!(created.priority, "normal");
    assert_eq!(created.user_id, Some(id));

    let mine = repo
        .list_user_help_requests(id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 1);

    let updated = repo
        .answer_help_request(
            created.id,
            HelpRequestUpdate {
                response: Some("Refunded".to_string()),
                status: Some("resolved".to_string()),
                priority: None,
            },
            AdminLogEntry {
                admin_email: "admin@test.com".to_string(),
                action: AdminAction::UpdateHelpRequest,
                target_user_id: None,
                reason: Some(format!("Updated request {}", created.id)),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "resolved");
    assert_eq!(updated.priority, "normal");
    assert!(updated.updated_at.is_some_and(|at| at <= Utc::now()));

    let filter = HelpRequestFilter {
        search: Some(subject),
        status: Some("resolved".to_string()),
        ..HelpRequestFilter::default()
    };
    let found = repo
        .list_help_requests(&filter, filter.page_request())
        .await
        .unwrap();
    assert_eq!(found.total, 1);

    assert!(repo.delete_help_request(created.id).await.unwrap());
    assert!(repo.get_help_request(created.id).await.unwrap().is_none());
}

// --- Analytics ---

#[tokio::test]
#[ignore]
async fn test_dashboard_counts_and_health() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = register(&repo, &unique_email("stats")).await;
    create_chat(&ctx.pool, owner, &["hello"]).await;

    let counts = repo.dashboard_counts().await.unwrap();
    assert!(counts.total_users >= 1);
    assert!(counts.total_conversations >= 1);
    assert!(counts.messages_today >= 1);

    let health = repo.health_metrics().await.unwrap();
    assert!(health.db_connected);
    assert!(health.chats_24h >= 1);
    assert!(health.avg_temperature.is_some());

    let today = Utc::now().date_naive();
    let series = repo.usage_series(today, today).await.unwrap();
    assert!(series.iter().all(|point| point.date == today));
}
