use dao_portal::{
    authz::{Denial, Verdict, authorize},
    error::AppError,
    models::Identity,
    role::RoleLevel,
};
use uuid::Uuid;

fn identity_with(role: Option<i32>) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: "someone@example.com".to_string(),
        user_role: role,
        status: None,
    }
}

#[test]
fn test_authorize_grid() {
    for user in RoleLevel::ALL {
        for required in RoleLevel::ALL {
            let identity = identity_with(Some(user.level()));
            let verdict = authorize(Some(&identity), Some(required));
            if user.level() >= required.level() {
                assert_eq!(verdict, Verdict::Allowed, "{user} on {required}");
            } else {
                assert_eq!(
                    verdict,
                    Verdict::Denied(Denial::InsufficientRole {
                        required,
                        actual: user
                    }),
                    "{user} on {required}"
                );
            }
        }
    }
}

#[test]
fn test_public_resources_allow_anyone() {
    assert!(authorize(None, None).is_allowed());
    assert!(authorize(Some(&identity_with(Some(1))), None).is_allowed());
}

#[test]
fn test_missing_identity_is_unauthenticated() {
    for required in RoleLevel::ALL {
        assert_eq!(
            authorize(None, Some(required)),
            Verdict::Denied(Denial::Unauthenticated)
        );
    }
}

#[test]
fn test_unmapped_role_is_treated_as_user() {
    let identity = identity_with(Some(42));
    assert!(authorize(Some(&identity), Some(RoleLevel::User)).is_allowed());
    assert!(!authorize(Some(&identity), Some(RoleLevel::Contributor)).is_allowed());

    let no_role = identity_with(None);
    assert!(authorize(Some(&no_role), Some(RoleLevel::User)).is_allowed());
}

#[test]
fn test_authorize_is_idempotent() {
    let identity = identity_with(Some(3));
    for required in [None, Some(RoleLevel::User), Some(RoleLevel::Admin)] {
        let first = authorize(Some(&identity), required);
        let second = authorize(Some(&identity), required);
        assert_eq!(first, second);
    }
}

#[test]
fn test_denials_map_to_status_codes() {
    let unauthenticated = AppError::from(Denial::Unauthenticated);
    assert_eq!(unauthenticated.status().as_u16(), 401);

    let forbidden = AppError::from(Denial::InsufficientRole {
        required: RoleLevel::Admin,
        actual: RoleLevel::User,
    });
    assert_eq!(forbidden.status().as_u16(), 403);
    assert_eq!(forbidden.client_message(), "Forbidden: admin role required");
}
