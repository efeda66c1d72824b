//! User management: listing profiles and changing roles.
//!
//! Both operations require `manageUsers`. Role changes are request/response:
//! nothing local changes until the backend confirms the new profile, and a
//! change of the caller's own role is refused before any request is sent.

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ErrorCode, Result, ZigmaError};
use crate::rbac::{Capability, Role};
use crate::session::{AuthHandle, Profile, UserId};

/// Listing filter. An empty filter keeps every profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive substring of email or full name.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        if self.role.is_some_and(|role| role != profile.role) {
            return false;
        }

        let needle = match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => needle.to_lowercase(),
            _ => return true,
        };
        profile.email.to_lowercase().contains(&needle)
            || profile
                .full_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
    }
}

/// Role administration on behalf of the signed-in user.
#[derive(Clone)]
pub struct RoleAdministrator {
    auth: AuthHandle,
}

impl RoleAdministrator {
    pub fn new(auth: AuthHandle) -> Self {
        Self { auth }
    }

    fn authorize(&self) -> Result<UserId> {
        let state = self.auth.state();
        let Some(caller) = state.user_id().cloned() else {
            return Err(ZigmaError::unauthorized("Sign in to manage users"));
        };
        if !state.has_permission(Capability::ManageUsers) {
            warn!(user_id = %caller, role = ?state.role(), "User management denied");
            return Err(ZigmaError::forbidden(
                "You do not have permission to manage users",
            ));
        }
        Ok(caller)
    }

    /// Profiles matching `filter`, newest first.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<Profile>> {
        self.authorize()?;
        let profiles = self.auth.backend().list_profiles().await?;
        Ok(profiles.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Change another user's role and return the profile the backend stored.
    pub async fn update_user_role(&self, target: &UserId, role: Role) -> Result<Profile> {
        let caller = self.authorize()?;
        if &caller == target {
            return Err(ZigmaError::new(
                ErrorCode::SelfRoleChange,
                "You cannot change your own role",
            ));
        }

        let profile = self.auth.backend().update_profile_role(target, role).await?;
        info!(
            changed_by = %caller,
            user_id = %target,
            role = %profile.role,
            "User role updated"
        );
        Ok(profile)
    }
}
