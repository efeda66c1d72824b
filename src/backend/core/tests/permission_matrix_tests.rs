//! Tests for the capability matrix and default routes.
//!
//! Tests cover:
//! - Every role/capability cell against the published matrix
//! - Completeness of each role's permission set
//! - Consistency of `has_capability` with the permission set
//! - Default landing routes

use zigma_core::rbac::{default_route_for, Capability, PermissionSet, Role};

// ============================================================================
// Matrix
// ============================================================================

// (capability, admin, staff, investor)
const EXPECTED: [(Capability, bool, bool, bool); 23] = [
    (Capability::ViewAdminDashboard, true, true, false),
    (Capability::ViewInvestorPortal, true, false, true),
    (Capability::ViewInvestors, true, true, false),
    (Capability::CreateInvestor, true, true, false),
    (Capability::EditInvestor, true, true, false),
    (Capability::DeleteInvestor, true, false, false),
    (Capability::ViewFunds, true, true, false),
    (Capability::CreateFund, true, false, false),
    (Capability::EditFund, true, true, false),
    (Capability::DeleteFund, true, false, false),
    (Capability::ViewOpportunities, true, true, false),
    (Capability::CreateOpportunity, true, true, false),
    (Capability::EditOpportunity, true, true, false),
    (Capability::DeleteOpportunity, true, false, false),
    (Capability::ViewLeads, true, true, false),
    (Capability::CreateLead, true, true, false),
    (Capability::EditLead, true, true, false),
    (Capability::DeleteLead, true, false, false),
    (Capability::ViewAllReports, true, true, false),
    (Capability::DownloadStatements, true, true, true),
    (Capability::ManageUsers, true, false, false),
    (Capability::ManageRoles, true, false, false),
    (Capability::SystemSettings, true, false, false),
];

#[test]
fn test_matrix_cells() {
    for (capability, admin, staff, investor) in EXPECTED {
        assert_eq!(Role::Admin.has_capability(capability), admin, "admin/{}", capability);
        assert_eq!(Role::Staff.has_capability(capability), staff, "staff/{}", capability);
        assert_eq!(
            Role::Investor.has_capability(capability),
            investor,
            "investor/{}",
            capability
        );
    }
}

#[test]
fn test_expected_table_covers_every_capability() {
    let listed: Vec<Capability> = EXPECTED.iter().map(|row| row.0).collect();
    assert_eq!(listed, Capability::ALL.to_vec());
}

#[test]
fn test_every_role_maps_to_complete_set() {
    for role in Role::ALL {
        let set = PermissionSet::for_role(role);
        assert_eq!(set.iter().count(), Capability::ALL.len());
        assert_eq!(set, role.permissions());
    }
}

#[test]
fn test_has_capability_equals_lookup() {
    for role in Role::ALL {
        let set = role.permissions();
        for capability in Capability::ALL {
            assert_eq!(role.has_capability(capability), set.get(capability));
        }
    }
}

#[test]
fn test_permission_set_wire_names() {
    let json = serde_json::to_value(Role::Investor.permissions()).unwrap();
    assert_eq!(json["viewInvestorPortal"], true);
    assert_eq!(json["downloadStatements"], true);
    assert_eq!(json["viewAdminDashboard"], false);
}

// ============================================================================
// Default Routes
// ============================================================================

#[test]
fn test_default_routes() {
    assert_eq!(
        default_route_for(Some(Role::Admin)),
        default_route_for(Some(Role::Staff))
    );
    assert_ne!(
        default_route_for(Some(Role::Investor)),
        default_route_for(Some(Role::Staff))
    );
    assert_eq!(default_route_for(Some(Role::Investor)), "/investor/dashboard");
    assert_eq!(default_route_for(None), "/login");
}
