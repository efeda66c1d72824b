//! Dashboard roles.
//!
//! ZIGMA ships with three fixed roles:
//!
//! | Role     | Description                                                      |
//! |----------|------------------------------------------------------------------|
//! | Admin    | Full access, including user and role management                  |
//! | Staff    | Manage investors, funds, opportunities and leads; cannot delete  |
//! | Investor | Personal portfolio, transactions and statements only             |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::permissions::{Capability, PermissionSet};
use crate::error::{ErrorCode, ZigmaError};

/// Role of a dashboard user.
///
/// A role is read from the backend profile record; the current user never
/// assigns their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Investor,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Staff, Role::Investor];

    /// Get the role identifier string.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Investor => "investor",
        }
    }

    /// Get the human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Staff => "Staff",
            Self::Investor => "Investor",
        }
    }

    /// Get the description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Admin => "Full access to every dashboard area and user management",
            Self::Staff => "Manage investors, funds, opportunities and leads; no deletes",
            Self::Investor => "Personal portfolio, transactions and statements",
        }
    }

    /// The complete permission set of this role.
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::for_role(*self)
    }

    /// Whether this role holds the capability.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.permissions().get(capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Role {
    type Err = ZigmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "investor" => Ok(Self::Investor),
            other => Err(ZigmaError::new(
                ErrorCode::InvalidRole,
                format!("Unknown role: {}", other),
            )),
        }
    }
}
