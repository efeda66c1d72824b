//! Route guard: render, wait or redirect.
//!
//! The decision is a pure function of the current access state and a
//! per-route [`GuardConfig`]. Checks run in a fixed order:
//!
//! 1. still loading → [`GuardDecision::Loading`] (never redirect while loading)
//! 2. no session → redirect to `/login`
//! 3. required capability missing → redirect to the configured target, else the
//!    role's default route
//! 4. role not in the allow-list → same redirect as 3
//! 5. otherwise → [`GuardDecision::Render`]
//!
//! Denial is not an error; it is a redirect.

pub mod middleware;
pub mod table;

use crate::rbac::routes::{AUTH_CALLBACK, LANDING, LOGIN};
use crate::rbac::{default_route_for, Capability, Role};
use crate::session::AuthState;

pub use middleware::{RequireAccessLayer, RequireAccessService};
pub use table::{
    navigate, resolve_path, route_decision, Layout, NavigationOutcome, RouteMatch, RouteSpec,
    ROUTES,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Access View
// ═══════════════════════════════════════════════════════════════════════════════

/// What the guard needs to know about the current user.
pub trait AccessView {
    fn is_loading(&self) -> bool;

    fn has_session(&self) -> bool;

    fn role(&self) -> Option<Role>;

    fn has_permission(&self, capability: Capability) -> bool;

    fn default_route(&self) -> &'static str {
        default_route_for(self.role())
    }
}

impl AccessView for AuthState {
    fn is_loading(&self) -> bool {
        AuthState::is_loading(self)
    }

    fn has_session(&self) -> bool {
        self.session().is_some()
    }

    fn role(&self) -> Option<Role> {
        AuthState::role(self)
    }

    fn has_permission(&self, capability: Capability) -> bool {
        AuthState::has_permission(self, capability)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration & Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-route guard settings. All fields optional; an empty config only
/// requires a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardConfig {
    pub required_permission: Option<Capability>,
    pub allowed_roles: Option<&'static [Role]>,
    pub redirect_to: Option<&'static str>,
}

impl GuardConfig {
    pub const fn new() -> Self {
        Self {
            required_permission: None,
            allowed_roles: None,
            redirect_to: None,
        }
    }

    pub const fn require(self, capability: Capability) -> Self {
        Self {
            required_permission: Some(capability),
            ..self
        }
    }

    pub const fn allow_roles(self, roles: &'static [Role]) -> Self {
        Self {
            allowed_roles: Some(roles),
            ..self
        }
    }

    pub const fn redirect_to(self, path: &'static str) -> Self {
        Self {
            redirect_to: Some(path),
            ..self
        }
    }
}

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a neutral placeholder; the state is not settled yet.
    Loading,
    /// Show the protected content.
    Render,
    /// Replace navigation with this path.
    Redirect(&'static str),
}

impl GuardDecision {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Render => "render",
            Self::Redirect(_) => "redirect",
        }
    }

    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::Redirect(to) => Some(*to),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluate one guard.
pub fn evaluate<V: AccessView + ?Sized>(view: &V, config: &GuardConfig) -> GuardDecision {
    if view.is_loading() {
        return GuardDecision::Loading;
    }
    if !view.has_session() {
        return GuardDecision::Redirect(LOGIN);
    }

    let denied_target = || config.redirect_to.unwrap_or_else(|| view.default_route());

    if let Some(capability) = config.required_permission {
        if !view.has_permission(capability) {
            return GuardDecision::Redirect(denied_target());
        }
    }

    if let Some(allowed) = config.allowed_roles {
        let permitted = view.role().is_some_and(|role| allowed.contains(&role));
        if !permitted {
            return GuardDecision::Redirect(denied_target());
        }
    }

    GuardDecision::Render
}

/// Evaluate nested guards, outermost first. An inner guard is only consulted
/// once every enclosing guard renders.
pub fn evaluate_nested<V: AccessView + ?Sized>(view: &V, guards: &[GuardConfig]) -> GuardDecision {
    for guard in guards {
        let decision = evaluate(view, guard);
        if decision != GuardDecision::Render {
            return decision;
        }
    }
    GuardDecision::Render
}

/// A settled session visiting the landing or login page is sent to its
/// default route.
pub fn public_page_redirect<V: AccessView + ?Sized>(view: &V, path: &str) -> Option<&'static str> {
    if view.is_loading() || !view.has_session() {
        return None;
    }
    if path == LANDING || path == LOGIN {
        Some(view.default_route())
    } else {
        None
    }
}

/// Where the OAuth callback page goes once the state settles.
pub fn callback_redirect<V: AccessView + ?Sized>(view: &V) -> Option<&'static str> {
    if view.is_loading() {
        return None;
    }
    if view.has_session() {
        Some(view.default_route())
    } else {
        Some(LOGIN)
    }
}

/// True for the OAuth return path.
pub fn is_callback_path(path: &str) -> bool {
    path == AUTH_CALLBACK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn signed_in(role: Role) -> AuthState {
        AuthState::authenticated(Session::new("u-1", None), role)
    }

    #[test]
    fn test_loading_never_redirects() {
        let configs = [
            GuardConfig::new(),
            GuardConfig::new().require(Capability::ManageUsers),
            GuardConfig::new()
                .allow_roles(&[Role::Admin])
                .redirect_to("/nope"),
        ];
        for config in configs {
            assert_eq!(evaluate(&AuthState::loading(), &config), GuardDecision::Loading);
            assert_eq!(
                evaluate(&AuthState::uninitialized(), &config),
                GuardDecision::Loading
            );
        }
    }

    #[test]
    fn test_no_session_goes_to_login() {
        let config = GuardConfig::new().redirect_to("/elsewhere");
        assert_eq!(
            evaluate(&AuthState::anonymous(), &config),
            GuardDecision::Redirect("/login")
        );
    }

    #[test]
    fn test_missing_capability_redirects() {
        let config = GuardConfig::new().require(Capability::ManageUsers);
        assert_eq!(
            evaluate(&signed_in(Role::Staff), &config),
            GuardDecision::Redirect("/dashboard")
        );

        let config = config.redirect_to("/denied");
        assert_eq!(
            evaluate(&signed_in(Role::Staff), &config),
            GuardDecision::Redirect("/denied")
        );
        assert_eq!(evaluate(&signed_in(Role::Admin), &config), GuardDecision::Render);
    }

    #[test]
    fn test_allowed_roles() {
        let config = GuardConfig::new().allow_roles(&[Role::Admin, Role::Staff]);
        assert_eq!(evaluate(&signed_in(Role::Staff), &config), GuardDecision::Render);
        assert_eq!(
            evaluate(&signed_in(Role::Investor), &config),
            GuardDecision::Redirect("/investor/dashboard")
        );
    }

    #[test]
    fn test_session_without_role_fails_role_list() {
        let state = AuthState::resolving(Session::new("u-1", None));
        // Resolving counts as loading, so build a settled view by hand.
        struct NoRole;
        impl AccessView for NoRole {
            fn is_loading(&self) -> bool {
                false
            }
            fn has_session(&self) -> bool {
                true
            }
            fn role(&self) -> Option<Role> {
                None
            }
            fn has_permission(&self, _: Capability) -> bool {
                false
            }
        }

        assert_eq!(
            evaluate(&state, &GuardConfig::new()),
            GuardDecision::Loading
        );
        let config = GuardConfig::new().allow_roles(&[Role::Admin]);
        assert_eq!(evaluate(&NoRole, &config), GuardDecision::Redirect("/login"));
    }

    #[test]
    fn test_nested_stops_at_outer() {
        let guards = [
            GuardConfig::new().require(Capability::ViewInvestorPortal),
            GuardConfig::new().require(Capability::DownloadStatements),
        ];
        assert_eq!(
            evaluate_nested(&signed_in(Role::Staff), &guards),
            GuardDecision::Redirect("/dashboard")
        );
        assert_eq!(
            evaluate_nested(&signed_in(Role::Investor), &guards),
            GuardDecision::Render
        );
        assert_eq!(evaluate_nested(&signed_in(Role::Staff), &[]), GuardDecision::Render);
    }

    #[test]
    fn test_public_page_redirect() {
        let state = signed_in(Role::Investor);
        assert_eq!(public_page_redirect(&state, "/"), Some("/investor/dashboard"));
        assert_eq!(public_page_redirect(&state, "/login"), Some("/investor/dashboard"));
        assert_eq!(public_page_redirect(&state, "/funds"), None);
        assert_eq!(public_page_redirect(&AuthState::anonymous(), "/login"), None);
        assert_eq!(public_page_redirect(&AuthState::loading(), "/"), None);
    }

    #[test]
    fn test_callback_redirect() {
        assert_eq!(callback_redirect(&AuthState::loading()), None);
        assert_eq!(callback_redirect(&AuthState::anonymous()), Some("/login"));
        assert_eq!(callback_redirect(&signed_in(Role::Admin)), Some("/dashboard"));
    }

    #[test]
    fn test_decision_kind() {
        assert_eq!(GuardDecision::Loading.kind(), "loading");
        assert_eq!(GuardDecision::Render.kind(), "render");
        assert_eq!(GuardDecision::Redirect("/login").kind(), "redirect");
        assert_eq!(GuardDecision::Redirect("/login").redirect_target(), Some("/login"));
    }
}
