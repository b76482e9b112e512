use dao_portal::{
    config::AppConfig,
    middleware::{RouteDecision, decide, is_api_path},
    models::Identity,
    role::RoleLevel,
    route_table::{RoutePattern, RouteTable},
};
use uuid::Uuid;

#[test]
fn test_prefix_matches_on_segment_boundaries() {
    let pattern = RoutePattern::restricted("/admin", RoleLevel::Admin);
    assert!(pattern.matches("/admin"));
    assert!(pattern.matches("/admin/"));
    assert!(pattern.matches("/admin/users/1"));
    assert!(!pattern.matches("/administrator"));
    assert!(!pattern.matches("/api/admin"));
}

#[test]
fn test_root_matches_only_itself() {
    let root = RoutePattern::public("/");
    assert!(root.matches("/"));
    assert!(!root.matches("/dashboard"));
    assert!(!root.matches("/login"));
}

#[test]
fn test_first_match_wins() {
    let table = RouteTable::new(vec![
        RoutePattern::restricted("/admin/content", RoleLevel::Contributor),
        RoutePattern::restricted("/admin", RoleLevel::Admin),
    ]);
    assert_eq!(table.classify("/admin/content/edit"), Some(RoleLevel::Contributor));
    assert_eq!(table.classify("/admin/users"), Some(RoleLevel::Admin));

    let reversed = RouteTable::new(vec![
        RoutePattern::restricted("/admin", RoleLevel::Admin),
        RoutePattern::restricted("/admin/content", RoleLevel::Contributor),
    ]);
    assert_eq!(reversed.classify("/admin/content/edit"), Some(RoleLevel::Admin));
    assert_eq!(reversed.shadowed(), vec![(0, 1)]);
}

#[test]
fn test_standard_table_classification() {
    let table = RouteTable::standard();
    assert_eq!(table.classify("/"), None);
    assert_eq!(table.classify("/login"), None);
    assert_eq!(table.classify("/admin/login"), None);
    assert_eq!(table.classify("/api/health"), None);
    assert_eq!(table.classify("/api/register"), None);
    assert_eq!(table.classify("/dashboard/settings"), Some(RoleLevel::User));
    assert_eq!(table.classify("/admin/moderation/queue"), Some(RoleLevel::Contributor));
    assert_eq!(table.classify("/admin"), Some(RoleLevel::Admin));
    assert_eq!(table.classify("/api/admin/users/1/ban"), Some(RoleLevel::Admin));
    assert_eq!(table.classify("/api/dashboard/upgrade/plan"), Some(RoleLevel::User));
    assert_eq!(table.classify("/api/rate-limit/check"), Some(RoleLevel::User));
}

#[test]
fn test_standard_table_has_no_shadowed_entries() {
    assert!(RouteTable::standard().shadowed().is_empty());
}

#[test]
fn test_unmatched_paths_default_allow_unless_configured() {
    let table = RouteTable::standard();
    assert_eq!(table.classify("/blog/post"), None);

    let strict = RouteTable::standard().with_unmatched(Some(RoleLevel::User));
    assert_eq!(strict.classify("/blog/post"), Some(RoleLevel::User));
    assert_eq!(strict.classify("/login"), None);
}

fn identity(role: i32) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: "member@example.com".to_string(),
        user_role: Some(role),
        status: None,
    }
}

#[test]
fn test_decide_state_machine() {
    let config = AppConfig::default();

    assert_eq!(decide("/about", None, None, &config), RouteDecision::Allow);

    assert_eq!(
        decide("/dashboard/settings", Some(RoleLevel::User), None, &config),
        RouteDecision::RedirectLogin {
            location: "/login?callbackUrl=%2Fdashboard%2Fsettings".to_string()
        }
    );

    assert_eq!(
        decide("/admin/content", Some(RoleLevel::Contributor), Some(&identity(2)), &config),
        RouteDecision::RedirectForbidden {
            location: "/unauthorized?reason=contributor_required".to_string(),
            required: RoleLevel::Contributor,
        }
    );

    assert_eq!(
        decide("/admin", Some(RoleLevel::Admin), Some(&identity(4)), &config),
        RouteDecision::Allow
    );
}

#[test]
fn test_api_path_detection() {
    assert!(is_api_path("/api/admin"));
    assert!(is_api_path("/api"));
    assert!(!is_api_path("/apiary"));
    assert!(!is_api_path("/admin"));
}
