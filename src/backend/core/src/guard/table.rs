//! Dashboard route table.
//!
//! Protected routes sit inside a layout; the layout guard is evaluated first
//! and the page guard only once the layout renders.

use serde::Serialize;

use super::{
    callback_redirect, evaluate_nested, is_callback_path, public_page_redirect, AccessView,
    GuardConfig, GuardDecision,
};
use crate::rbac::{Capability, Role};

/// Shell a page is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Public,
    Staff,
    Investor,
}

const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Staff];

impl Layout {
    /// Guard wrapping every page of the layout.
    pub const fn guard(&self) -> Option<GuardConfig> {
        match self {
            Self::Public => None,
            Self::Staff => Some(GuardConfig::new().allow_roles(STAFF_ROLES)),
            Self::Investor => Some(GuardConfig::new().require(Capability::ViewInvestorPortal)),
        }
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    /// Path pattern; `:name` segments match any single segment.
    pub pattern: &'static str,
    pub page: &'static str,
    pub layout: Layout,
    pub guard: Option<GuardConfig>,
}

impl RouteSpec {
    const fn public(pattern: &'static str, page: &'static str) -> Self {
        Self {
            pattern,
            page,
            layout: Layout::Public,
            guard: None,
        }
    }

    const fn staff(pattern: &'static str, page: &'static str, capability: Capability) -> Self {
        Self {
            pattern,
            page,
            layout: Layout::Staff,
            guard: Some(GuardConfig::new().require(capability)),
        }
    }

    const fn investor(pattern: &'static str, page: &'static str, guard: Option<GuardConfig>) -> Self {
        Self {
            pattern,
            page,
            layout: Layout::Investor,
            guard,
        }
    }

    pub fn is_public(&self) -> bool {
        self.layout == Layout::Public
    }

    /// Guard chain, outermost first.
    pub fn guards(&self) -> Vec<GuardConfig> {
        self.layout.guard().into_iter().chain(self.guard).collect()
    }

    /// The route's axum path (identical pattern syntax).
    pub fn axum_path(&self) -> &'static str {
        self.pattern
    }

    /// Match a concrete path, returning the captured parameters.
    pub fn match_path(&self, path: &str) -> Option<Vec<(&'static str, String)>> {
        let wanted = segments(self.pattern);
        let actual = segments(path);
        if wanted.len() != actual.len() {
            return None;
        }

        let mut params = Vec::new();
        for (pattern, segment) in wanted.into_iter().zip(actual) {
            match pattern.strip_prefix(':') {
                Some(name) if !segment.is_empty() => params.push((name, segment.to_string())),
                Some(_) => return None,
                None if pattern == segment => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Every dashboard route.
pub static ROUTES: &[RouteSpec] = &[
    // Public
    RouteSpec::public("/", "Landing"),
    RouteSpec::public("/login", "Login"),
    RouteSpec::public("/auth/callback", "AuthCallback"),
    // Staff layout
    RouteSpec::staff("/dashboard", "Dashboard", Capability::ViewAdminDashboard),
    RouteSpec::staff("/investors", "Investors", Capability::ViewInvestors),
    RouteSpec::staff("/investors/:id", "InvestorDetails", Capability::ViewInvestors),
    RouteSpec::staff("/funds", "Funds", Capability::ViewFunds),
    RouteSpec::staff("/opportunities", "Opportunities", Capability::ViewOpportunities),
    RouteSpec::staff("/leads", "Leads", Capability::ViewLeads),
    RouteSpec::staff("/reports", "Reports", Capability::ViewAllReports),
    RouteSpec::staff("/users", "UserManagement", Capability::ManageUsers),
    RouteSpec::staff("/settings", "Settings", Capability::SystemSettings),
    // Investor layout
    RouteSpec::investor("/investor/dashboard", "InvestorDashboard", None),
    RouteSpec::investor("/investor/transactions", "InvestorTransactions", None),
    RouteSpec::investor(
        "/investor/documents",
        "InvestorDocuments",
        Some(GuardConfig::new().require(Capability::DownloadStatements)),
    ),
    RouteSpec::investor("/investor/profile", "InvestorProfile", None),
];

/// A route matched against a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static RouteSpec,
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Find the route serving `path`. Literal routes win over parameterized
/// ones because the table lists them first.
pub fn resolve_path(path: &str) -> Option<RouteMatch> {
    ROUTES.iter().find_map(|route| {
        route
            .match_path(path)
            .map(|params| RouteMatch { route, params })
    })
}

/// Full navigation decision for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Render(RouteMatch),
    Loading(RouteMatch),
    Redirect(&'static str),
    NotFound,
}

impl NavigationOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Render(_) => "render",
            Self::Loading(_) => "loading",
            Self::Redirect(_) => "redirect",
            Self::NotFound => "not_found",
        }
    }
}

/// Guard decision for one route: public pages apply the signed-in redirect,
/// the OAuth callback waits for a settled state, and protected pages run
/// their guard chain.
pub fn route_decision<V: AccessView + ?Sized>(view: &V, route: &RouteSpec) -> GuardDecision {
    if !route.is_public() {
        return evaluate_nested(view, &route.guards());
    }

    if is_callback_path(route.pattern) {
        return match callback_redirect(view) {
            Some(to) => GuardDecision::Redirect(to),
            None => GuardDecision::Loading,
        };
    }
    match public_page_redirect(view, route.pattern) {
        Some(to) => GuardDecision::Redirect(to),
        None => GuardDecision::Render,
    }
}

/// Decide what visiting `path` does for the current user.
pub fn navigate<V: AccessView + ?Sized>(view: &V, path: &str) -> NavigationOutcome {
    let Some(matched) = resolve_path(path) else {
        return NavigationOutcome::NotFound;
    };

    match route_decision(view, matched.route) {
        GuardDecision::Render => NavigationOutcome::Render(matched),
        GuardDecision::Loading => NavigationOutcome::Loading(matched),
        GuardDecision::Redirect(to) => NavigationOutcome::Redirect(to),
    }
}
