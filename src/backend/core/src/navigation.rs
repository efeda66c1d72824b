//! Sidebar menus and the permission filter applied to them.

use serde::Serialize;

use crate::rbac::{Capability, PermissionSet, Role};
use crate::session::AuthState;

/// One sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub name: &'static str,
    pub href: &'static str,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<Capability>,
}

impl NavigationItem {
    pub const fn new(name: &'static str, href: &'static str, icon: &'static str) -> Self {
        Self {
            name,
            href,
            icon,
            required_permission: None,
        }
    }

    pub const fn requires(self, capability: Capability) -> Self {
        Self {
            required_permission: Some(capability),
            ..self
        }
    }

    /// Visible under `permissions`; anonymous users only see unrestricted items.
    pub fn is_visible(&self, permissions: Option<&PermissionSet>) -> bool {
        match self.required_permission {
            None => true,
            Some(capability) => permissions.is_some_and(|p| p.get(capability)),
        }
    }
}

/// Staff and admin layout menu.
pub static STAFF_NAVIGATION: &[NavigationItem] = &[
    NavigationItem::new("Dashboard", "/dashboard", "layout-dashboard")
        .requires(Capability::ViewAdminDashboard),
    NavigationItem::new("Investors", "/investors", "users").requires(Capability::ViewInvestors),
    NavigationItem::new("Funds", "/funds", "landmark").requires(Capability::ViewFunds),
    NavigationItem::new("Opportunities", "/opportunities", "target")
        .requires(Capability::ViewOpportunities),
    NavigationItem::new("Leads", "/leads", "briefcase").requires(Capability::ViewLeads),
    NavigationItem::new("Reports", "/reports", "pie-chart").requires(Capability::ViewAllReports),
    NavigationItem::new("User Management", "/users", "user-cog").requires(Capability::ManageUsers),
    NavigationItem::new("Settings", "/settings", "settings").requires(Capability::SystemSettings),
];

/// Investor portal menu.
pub static INVESTOR_NAVIGATION: &[NavigationItem] = &[
    NavigationItem::new("Portfolio", "/investor/dashboard", "layout-dashboard"),
    NavigationItem::new("Transactions", "/investor/transactions", "file-text"),
    NavigationItem::new("Documents", "/investor/documents", "download")
        .requires(Capability::DownloadStatements),
    NavigationItem::new("Profile", "/investor/profile", "user"),
];

/// Keep the items the permission set allows, in their original order.
pub fn filter_navigation(
    items: &[NavigationItem],
    permissions: Option<&PermissionSet>,
) -> Vec<NavigationItem> {
    items
        .iter()
        .filter(|item| item.is_visible(permissions))
        .copied()
        .collect()
}

/// Menu of the layout a role lands in.
pub fn navigation_for(role: Option<Role>) -> &'static [NavigationItem] {
    match role {
        Some(Role::Investor) => INVESTOR_NAVIGATION,
        _ => STAFF_NAVIGATION,
    }
}

/// The filtered menu for the current state. Recomputed on every call.
pub fn visible_navigation(state: &AuthState) -> Vec<NavigationItem> {
    filter_navigation(navigation_for(state.role()), state.permissions())
}
