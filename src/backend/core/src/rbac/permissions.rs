//! Capability matrix: the single source of truth for what each role may do.
//!
//! The matrix is fixed at compile time. Every role maps to one complete
//! [`PermissionSet`] and every lookup is an exhaustive `match`, so a missing
//! capability key is a compile error rather than a runtime `undefined`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::roles::Role;
use crate::error::{ErrorCode, ZigmaError};

// ═══════════════════════════════════════════════════════════════════════════════
// Capability
// ═══════════════════════════════════════════════════════════════════════════════

/// A single named authorization flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    // Dashboards
    ViewAdminDashboard,
    ViewInvestorPortal,

    // Investors
    ViewInvestors,
    CreateInvestor,
    EditInvestor,
    DeleteInvestor,

    // Funds
    ViewFunds,
    CreateFund,
    EditFund,
    DeleteFund,

    // Opportunities
    ViewOpportunities,
    CreateOpportunity,
    EditOpportunity,
    DeleteOpportunity,

    // Leads
    ViewLeads,
    CreateLead,
    EditLead,
    DeleteLead,

    // Reports & documents
    ViewAllReports,
    DownloadStatements,

    // System
    ManageUsers,
    ManageRoles,
    SystemSettings,
}

impl Capability {
    /// Every capability, in matrix order.
    pub const ALL: [Capability; 23] = [
        Self::ViewAdminDashboard,
        Self::ViewInvestorPortal,
        Self::ViewInvestors,
        Self::CreateInvestor,
        Self::EditInvestor,
        Self::DeleteInvestor,
        Self::ViewFunds,
        Self::CreateFund,
        Self::EditFund,
        Self::DeleteFund,
        Self::ViewOpportunities,
        Self::CreateOpportunity,
        Self::EditOpportunity,
        Self::DeleteOpportunity,
        Self::ViewLeads,
        Self::CreateLead,
        Self::EditLead,
        Self::DeleteLead,
        Self::ViewAllReports,
        Self::DownloadStatements,
        Self::ManageUsers,
        Self::ManageRoles,
        Self::SystemSettings,
    ];

    /// Wire name of the capability (camelCase).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ViewAdminDashboard => "viewAdminDashboard",
            Self::ViewInvestorPortal => "viewInvestorPortal",
            Self::ViewInvestors => "viewInvestors",
            Self::CreateInvestor => "createInvestor",
            Self::EditInvestor => "editInvestor",
            Self::DeleteInvestor => "deleteInvestor",
            Self::ViewFunds => "viewFunds",
            Self::CreateFund => "createFund",
            Self::EditFund => "editFund",
            Self::DeleteFund => "deleteFund",
            Self::ViewOpportunities => "viewOpportunities",
            Self::CreateOpportunity => "createOpportunity",
            Self::EditOpportunity => "editOpportunity",
            Self::DeleteOpportunity => "deleteOpportunity",
            Self::ViewLeads => "viewLeads",
            Self::CreateLead => "createLead",
            Self::EditLead => "editLead",
            Self::DeleteLead => "deleteLead",
            Self::ViewAllReports => "viewAllReports",
            Self::DownloadStatements => "downloadStatements",
            Self::ManageUsers => "manageUsers",
            Self::ManageRoles => "manageRoles",
            Self::SystemSettings => "systemSettings",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = ZigmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|cap| cap.name() == s)
            .ok_or_else(|| {
                ZigmaError::new(
                    ErrorCode::InvalidCapability,
                    format!("Unknown capability: {}", s),
                )
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PermissionSet
// ═══════════════════════════════════════════════════════════════════════════════

/// The full collection of capability flags for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub view_admin_dashboard: bool,
    pub view_investor_portal: bool,

    pub view_investors: bool,
    pub create_investor: bool,
    pub edit_investor: bool,
    pub delete_investor: bool,

    pub view_funds: bool,
    pub create_fund: bool,
    pub edit_fund: bool,
    pub delete_fund: bool,

    pub view_opportunities: bool,
    pub create_opportunity: bool,
    pub edit_opportunity: bool,
    pub delete_opportunity: bool,

    pub view_leads: bool,
    pub create_lead: bool,
    pub edit_lead: bool,
    pub delete_lead: bool,

    pub view_all_reports: bool,
    pub download_statements: bool,

    pub manage_users: bool,
    pub manage_roles: bool,
    pub system_settings: bool,
}

const ADMIN_PERMISSIONS: PermissionSet = PermissionSet {
    view_admin_dashboard: true,
    view_investor_portal: true,
    view_investors: true,
    create_investor: true,
    edit_investor: true,
    delete_investor: true,
    view_funds: true,
    create_fund: true,
    edit_fund: true,
    delete_fund: true,
    view_opportunities: true,
    create_opportunity: true,
    edit_opportunity: true,
    delete_opportunity: true,
    view_leads: true,
    create_lead: true,
    edit_lead: true,
    delete_lead: true,
    view_all_reports: true,
    download_statements: true,
    manage_users: true,
    manage_roles: true,
    system_settings: true,
};

// View and edit, never delete; no fund creation, no system areas.
const STAFF_PERMISSIONS: PermissionSet = PermissionSet {
    view_admin_dashboard: true,
    view_investor_portal: false,
    view_investors: true,
    create_investor: true,
    edit_investor: true,
    delete_investor: false,
    view_funds: true,
    create_fund: false,
    edit_fund: true,
    delete_fund: false,
    view_opportunities: true,
    create_opportunity: true,
    edit_opportunity: true,
    delete_opportunity: false,
    view_leads: true,
    create_lead: true,
    edit_lead: true,
    delete_lead: false,
    view_all_reports: true,
    download_statements: true,
    manage_users: false,
    manage_roles: false,
    system_settings: false,
};

// Personal portfolio only.
const INVESTOR_PERMISSIONS: PermissionSet = PermissionSet {
    view_admin_dashboard: false,
    view_investor_portal: true,
    view_investors: false,
    create_investor: false,
    edit_investor: false,
    delete_investor: false,
    view_funds: false,
    create_fund: false,
    edit_fund: false,
    delete_fund: false,
    view_opportunities: false,
    create_opportunity: false,
    edit_opportunity: false,
    delete_opportunity: false,
    view_leads: false,
    create_lead: false,
    edit_lead: false,
    delete_lead: false,
    view_all_reports: false,
    download_statements: true,
    manage_users: false,
    manage_roles: false,
    system_settings: false,
};

impl PermissionSet {
    /// The complete permission set of a role.
    pub const fn for_role(role: Role) -> PermissionSet {
        match role {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Staff => STAFF_PERMISSIONS,
            Role::Investor => INVESTOR_PERMISSIONS,
        }
    }

    /// Value of a single capability flag.
    pub const fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewAdminDashboard => self.view_admin_dashboard,
            Capability::ViewInvestorPortal => self.view_investor_portal,
            Capability::ViewInvestors => self.view_investors,
            Capability::CreateInvestor => self.create_investor,
            Capability::EditInvestor => self.edit_investor,
            Capability::DeleteInvestor => self.delete_investor,
            Capability::ViewFunds => self.view_funds,
            Capability::CreateFund => self.create_fund,
            Capability::EditFund => self.edit_fund,
            Capability::DeleteFund => self.delete_fund,
            Capability::ViewOpportunities => self.view_opportunities,
            Capability::CreateOpportunity => self.create_opportunity,
            Capability::EditOpportunity => self.edit_opportunity,
            Capability::DeleteOpportunity => self.delete_opportunity,
            Capability::ViewLeads => self.view_leads,
            Capability::CreateLead => self.create_lead,
            Capability::EditLead => self.edit_lead,
            Capability::DeleteLead => self.delete_lead,
            Capability::ViewAllReports => self.view_all_reports,
            Capability::DownloadStatements => self.download_statements,
            Capability::ManageUsers => self.manage_users,
            Capability::ManageRoles => self.manage_roles,
            Capability::SystemSettings => self.system_settings,
        }
    }

    /// All (capability, flag) pairs in matrix order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        Capability::ALL.iter().map(move |cap| (*cap, self.get(*cap)))
    }

    /// Capabilities whose flag is set.
    pub fn granted(&self) -> Vec<Capability> {
        self.iter()
            .filter_map(|(cap, allowed)| allowed.then_some(cap))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_every_capability_key() {
        for role in Role::ALL {
            let json = serde_json::to_value(PermissionSet::for_role(role)).unwrap();
            let object = json.as_object().unwrap();
            assert_eq!(object.len(), Capability::ALL.len());
            for cap in Capability::ALL {
                assert!(
                    object.get(cap.name()).and_then(|v| v.as_bool()).is_some(),
                    "{} missing {}",
                    role,
                    cap
                );
            }
        }
    }

    #[test]
    fn test_has_capability_matches_permission_set() {
        for role in Role::ALL {
            let set = PermissionSet::for_role(role);
            for cap in Capability::ALL {
                assert_eq!(role.has_capability(cap), set.get(cap));
            }
        }
    }

    #[test]
    fn test_admin_holds_everything() {
        assert_eq!(Role::Admin.permissions().granted().len(), Capability::ALL.len());
    }

    #[test]
    fn test_staff_and_investor_grants() {
        let staff = Role::Staff.permissions();
        assert!(staff.view_admin_dashboard);
        assert!(staff.edit_fund);
        assert!(!staff.create_fund);
        assert!(!staff.system_settings);
        assert_eq!(staff.granted().len(), 14);

        let investor = Role::Investor.permissions();
        assert_eq!(
            investor.granted(),
            vec![Capability::ViewInvestorPortal, Capability::DownloadStatements]
        );
    }

    #[test]
    fn test_capability_names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(cap.name().parse::<Capability>().unwrap(), cap);
            let json = serde_json::to_string(&cap).unwrap();
            assert_eq!(json, format!("\"{}\"", cap.name()));
        }
    }

    #[test]
    fn test_unknown_capability() {
        let err = "approveWire".parse::<Capability>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCapability);
        // Names are exact, not case-folded
        assert!("ManageUsers".parse::<Capability>().is_err());
    }
}
