//! Tests for the route guard and the dashboard route table.
//!
//! Tests cover:
//! - Guard decision order (loading, session, capability, role list)
//! - Explicit redirect targets
//! - Nested guards
//! - Route-table navigation for each role
//! - Public-page and OAuth-callback redirects

use zigma_core::guard::{
    evaluate, evaluate_nested, navigate, GuardConfig, GuardDecision, NavigationOutcome,
};
use zigma_core::rbac::{Capability, Role};
use zigma_core::session::{AuthState, Session};

fn signed_in(role: Role) -> AuthState {
    AuthState::authenticated(Session::new("user-1", Some("u@zigma.io".into())), role)
}

fn redirect_of(outcome: NavigationOutcome) -> Option<&'static str> {
    match outcome {
        NavigationOutcome::Redirect(to) => Some(to),
        _ => None,
    }
}

fn page_of(outcome: NavigationOutcome) -> Option<&'static str> {
    match outcome {
        NavigationOutcome::Render(matched) => Some(matched.route.page),
        _ => None,
    }
}

// ============================================================================
// Guard Decisions
// ============================================================================

#[test]
fn test_loading_never_redirects() {
    let config = GuardConfig::new()
        .require(Capability::ManageUsers)
        .allow_roles(&[Role::Admin])
        .redirect_to("/somewhere");
    assert_eq!(evaluate(&AuthState::loading(), &config), GuardDecision::Loading);
}

#[test]
fn test_no_session_always_redirects_to_login() {
    for config in [
        GuardConfig::new(),
        GuardConfig::new().require(Capability::DownloadStatements),
        GuardConfig::new().redirect_to("/dashboard"),
    ] {
        assert_eq!(
            evaluate(&AuthState::anonymous(), &config),
            GuardDecision::Redirect("/login")
        );
    }
}

#[test]
fn test_staff_denied_manage_users() {
    let config = GuardConfig::new().require(Capability::ManageUsers);
    assert_eq!(
        evaluate(&signed_in(Role::Staff), &config),
        GuardDecision::Redirect("/dashboard")
    );

    let config = config.redirect_to("/not-allowed");
    assert_eq!(
        evaluate(&signed_in(Role::Staff), &config),
        GuardDecision::Redirect("/not-allowed")
    );
}

#[test]
fn test_admin_renders_manage_users() {
    let config = GuardConfig::new().require(Capability::ManageUsers);
    assert_eq!(evaluate(&signed_in(Role::Admin), &config), GuardDecision::Render);
}

#[test]
fn test_capability_checked_before_role_list() {
    let config = GuardConfig::new()
        .require(Capability::ViewInvestorPortal)
        .allow_roles(&[Role::Staff]);
    // Staff passes the role list but lacks the capability.
    assert_eq!(
        evaluate(&signed_in(Role::Staff), &config),
        GuardDecision::Redirect("/dashboard")
    );
    // Investor has the capability but fails the role list.
    assert_eq!(
        evaluate(&signed_in(Role::Investor), &config),
        GuardDecision::Redirect("/investor/dashboard")
    );
}

#[test]
fn test_nested_guards_outer_first() {
    let guards = [
        GuardConfig::new().allow_roles(&[Role::Admin, Role::Staff]),
        GuardConfig::new()
            .require(Capability::SystemSettings)
            .redirect_to("/dashboard"),
    ];
    assert_eq!(
        evaluate_nested(&signed_in(Role::Investor), &guards),
        GuardDecision::Redirect("/investor/dashboard")
    );
    assert_eq!(
        evaluate_nested(&signed_in(Role::Staff), &guards),
        GuardDecision::Redirect("/dashboard")
    );
    assert_eq!(evaluate_nested(&signed_in(Role::Admin), &guards), GuardDecision::Render);
    assert_eq!(
        evaluate_nested(&AuthState::loading(), &guards),
        GuardDecision::Loading
    );
}

// ============================================================================
// Route Table Navigation
// ============================================================================

#[test]
fn test_staff_on_users_goes_to_dashboard() {
    assert_eq!(redirect_of(navigate(&signed_in(Role::Staff), "/users")), Some("/dashboard"));
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Staff), "/settings")),
        Some("/dashboard")
    );
}

#[test]
fn test_investor_on_dashboard_goes_to_portal() {
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Investor), "/dashboard")),
        Some("/investor/dashboard")
    );
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Investor), "/funds")),
        Some("/investor/dashboard")
    );
}

#[test]
fn test_staff_on_investor_portal_goes_to_dashboard() {
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Staff), "/investor/profile")),
        Some("/dashboard")
    );
}

#[test]
fn test_admin_reaches_both_layouts() {
    let admin = signed_in(Role::Admin);
    assert_eq!(page_of(navigate(&admin, "/users")), Some("UserManagement"));
    assert_eq!(page_of(navigate(&admin, "/investor/documents")), Some("InvestorDocuments"));
}

#[test]
fn test_parameterized_investor_route() {
    match navigate(&signed_in(Role::Staff), "/investors/42") {
        NavigationOutcome::Render(matched) => {
            assert_eq!(matched.route.page, "InvestorDetails");
            assert_eq!(matched.param("id"), Some("42"));
        }
        other => panic!("expected render, got {:?}", other),
    }
}

#[test]
fn test_anonymous_protected_page_goes_to_login() {
    assert_eq!(
        redirect_of(navigate(&AuthState::anonymous(), "/investor/dashboard")),
        Some("/login")
    );
}

#[test]
fn test_loading_protected_page() {
    assert!(matches!(
        navigate(&AuthState::loading(), "/dashboard"),
        NavigationOutcome::Loading(_)
    ));
}

#[test]
fn test_unknown_path() {
    assert_eq!(navigate(&signed_in(Role::Admin), "/nowhere"), NavigationOutcome::NotFound);
}

// ============================================================================
// Public Pages
// ============================================================================

#[test]
fn test_authenticated_login_visit_redirects() {
    assert_eq!(redirect_of(navigate(&signed_in(Role::Staff), "/login")), Some("/dashboard"));
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Investor), "/")),
        Some("/investor/dashboard")
    );
}

#[test]
fn test_public_pages_render_for_anonymous_and_loading() {
    assert_eq!(page_of(navigate(&AuthState::anonymous(), "/login")), Some("Login"));
    assert_eq!(page_of(navigate(&AuthState::loading(), "/")), Some("Landing"));
}

#[test]
fn test_callback_page() {
    assert!(matches!(
        navigate(&AuthState::loading(), "/auth/callback"),
        NavigationOutcome::Loading(_)
    ));
    assert_eq!(
        redirect_of(navigate(&AuthState::anonymous(), "/auth/callback")),
        Some("/login")
    );
    assert_eq!(
        redirect_of(navigate(&signed_in(Role::Admin), "/auth/callback")),
        Some("/dashboard")
    );
}
