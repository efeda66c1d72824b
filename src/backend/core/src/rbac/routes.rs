//! Canonical dashboard paths and the role → landing-page mapping.

use super::roles::Role;

/// Public marketing landing page.
pub const LANDING: &str = "/";
/// Sign-in page; where every unauthenticated visit ends up.
pub const LOGIN: &str = "/login";
/// OAuth provider return path.
pub const AUTH_CALLBACK: &str = "/auth/callback";
/// Staff and admin home.
pub const ADMIN_DASHBOARD: &str = "/dashboard";
/// Investor portal home.
pub const INVESTOR_DASHBOARD: &str = "/investor/dashboard";

/// Landing path for a role. Admin and staff share the staff dashboard; no
/// role at all goes back to the login page.
pub const fn default_route_for(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) | Some(Role::Staff) => ADMIN_DASHBOARD,
        Some(Role::Investor) => INVESTOR_DASHBOARD,
        None => LOGIN,
    }
}

impl Role {
    /// Landing path for this role.
    pub const fn default_route(&self) -> &'static str {
        default_route_for(Some(*self))
    }
}
