//! Tests for user management.
//!
//! Tests cover:
//! - Capability and session checks
//! - Refusal of self role changes
//! - Role changes reaching the affected user's live session
//! - Listing filters

use std::sync::Arc;
use std::time::Duration;

use zigma_core::error::ErrorCode;
use zigma_core::rbac::Role;
use zigma_core::session::{AuthBackend, AuthHandle, InMemoryBackend, Session, SessionResolver};
use zigma_core::users::{RoleAdministrator, UserFilter};

struct Fixture {
    backend: InMemoryBackend,
    _resolver: SessionResolver,
    auth: AuthHandle,
    admin: Session,
    staff: Session,
    investor: Session,
}

async fn fixture() -> Fixture {
    let backend = InMemoryBackend::new();
    let admin = backend.add_user("admin@zigma.io", "pw", Some("Avery Admin"), Role::Admin);
    let staff = backend.add_user("staff@zigma.io", "pw", Some("Sam Staff"), Role::Staff);
    let investor = backend.add_user("mei@zigma.io", "pw", Some("Mei Chen"), Role::Investor);
    let resolver = SessionResolver::create(Arc::new(backend.clone()));
    let auth = resolver.handle();
    auth.initialize().await.unwrap();
    Fixture {
        backend,
        _resolver: resolver,
        auth,
        admin,
        staff,
        investor,
    }
}

async fn sign_in(fx: &Fixture, session: &Session) {
    fx.backend.emit_auth_change(Some(session.clone()));
    tokio::time::timeout(Duration::from_secs(2), fx.auth.wait_for_identity(&session.user_id))
        .await
        .unwrap()
        .unwrap();
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_anonymous_is_unauthorized() {
    let fx = fixture().await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let err = admin.list_users(&UserFilter::default()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[tokio::test]
async fn test_staff_cannot_manage_users() {
    let fx = fixture().await;
    sign_in(&fx, &fx.staff).await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let err = admin.list_users(&UserFilter::default()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    let err = admin
        .update_user_role(&fx.investor.user_id, Role::Staff)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let role = fx.backend.fetch_profile_role(&fx.investor.user_id).await.unwrap();
    assert_eq!(role, Some(Role::Investor));
}

// ============================================================================
// Role Changes
// ============================================================================

#[tokio::test]
async fn test_admin_cannot_change_own_role() {
    let fx = fixture().await;
    sign_in(&fx, &fx.admin).await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let err = admin
        .update_user_role(&fx.admin.user_id, Role::Staff)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::SelfRoleChange);
    assert_eq!(err.user_message(), "You cannot change your own role");
    assert_eq!(fx.auth.role(), Some(Role::Admin));
}

#[tokio::test]
async fn test_admin_changes_other_role() {
    let fx = fixture().await;
    sign_in(&fx, &fx.admin).await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let profile = admin
        .update_user_role(&fx.investor.user_id, Role::Staff)
        .await
        .unwrap();

    assert_eq!(profile.id, fx.investor.user_id);
    assert_eq!(profile.role, Role::Staff);
    let role = fx.backend.fetch_profile_role(&fx.investor.user_id).await.unwrap();
    assert_eq!(role, Some(Role::Staff));
}

#[tokio::test]
async fn test_change_reaches_affected_session() {
    let fx = fixture().await;
    let admin_backend = fx.backend.clone();
    sign_in(&fx, &fx.staff).await;

    // Another administrator promotes the signed-in staff member.
    admin_backend
        .update_profile_role(&fx.staff.user_id, Role::Admin)
        .await
        .unwrap();

    let mut rx = fx.auth.subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|s| s.role() == Some(Role::Admin)),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let fx = fixture().await;
    sign_in(&fx, &fx.admin).await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let err = admin
        .update_user_role(&"user-404".into(), Role::Staff)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecordNotFound);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_newest_first_and_filtered() {
    let fx = fixture().await;
    sign_in(&fx, &fx.admin).await;
    let admin = RoleAdministrator::new(fx.auth.clone());

    let all = admin.list_users(&UserFilter::default()).await.unwrap();
    let emails: Vec<&str> = all.iter().map(|p| p.email.as_str()).collect();
    assert_eq!(emails, vec!["mei@zigma.io", "staff@zigma.io", "admin@zigma.io"]);

    let filter = UserFilter {
        search: Some("chen".into()),
        role: None,
    };
    let found = admin.list_users(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fx.investor.user_id);

    let filter = UserFilter {
        search: None,
        role: Some(Role::Staff),
    };
    let found = admin.list_users(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, fx.staff.user_id);
}
