//! Session state: who is signed in and what role they hold.
//!
//! This module provides:
//! - **Types**: `Session`, `UserId`, `Profile` and the published `AuthState` snapshot
//! - **Backend**: the `AuthBackend` trait consumed from the auth/profile service,
//!   with an in-memory and a REST implementation
//! - **Resolver**: the single-writer actor that keeps `AuthState` current
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zigma_core::session::{InMemoryBackend, SessionResolver};
//!
//! let backend = Arc::new(InMemoryBackend::demo());
//! let resolver = SessionResolver::create(backend);
//! let auth = resolver.handle();
//! auth.initialize().await?;
//!
//! if auth.has_permission(Capability::ManageUsers) { /* ... */ }
//! ```

pub mod backend;
pub mod memory;
pub mod resolver;
pub mod rest;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rbac::{default_route_for, Capability, PermissionSet, Role};

pub use backend::{
    AuthBackend, AuthEventSink, OAuthProvider, OAuthRedirect, ProfileChange, ProfileEventSink,
    Subscription,
};
pub use memory::InMemoryBackend;
pub use resolver::{AuthHandle, SessionResolver};
pub use rest::RestBackend;

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque backend user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The currently authenticated identity.
///
/// The access token is never serialized and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: Option<String>,
    /// Arbitrary identity metadata (a JSON object).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            user_metadata: serde_json::Value::Object(Default::default()),
            access_token: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.user_metadata = metadata;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Role embedded in the identity metadata (`user_metadata.role`), if it
    /// names a known role.
    pub fn metadata_role(&self) -> Option<Role> {
        self.user_metadata
            .get("role")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("user_metadata", &self.user_metadata)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// A user profile record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Published State
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of the session resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// `initialize()` has not been called yet.
    Uninitialized,
    /// Waiting for the session read or for the role of a new identity.
    Loading,
    /// Settled with no session.
    Anonymous,
    /// Settled with a session and a resolved role.
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Anonymous => "anonymous",
            Self::Authenticated => "authenticated",
        }
    }

    /// Anything that is not yet settled counts as loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Loading)
    }
}

/// Snapshot of the (session, role, permissions) triple.
///
/// Snapshots are replaced whole; `role` and `permissions` are always both set
/// or both unset.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    status: SessionStatus,
    session: Option<Session>,
    role: Option<Role>,
    permissions: Option<PermissionSet>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl AuthState {
    pub fn uninitialized() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            session: None,
            role: None,
            permissions: None,
        }
    }

    /// Loading with no session known yet.
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            ..Self::uninitialized()
        }
    }

    /// Loading for a known session whose role is still being resolved.
    pub fn resolving(session: Session) -> Self {
        Self {
            status: SessionStatus::Loading,
            session: Some(session),
            role: None,
            permissions: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            ..Self::uninitialized()
        }
    }

    pub fn authenticated(session: Session, role: Role) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            session: Some(session),
            role: Some(role),
            permissions: Some(role.permissions()),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session.as_ref().map(|s| &s.user_id)
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    /// False whenever no permission set is resolved.
    pub fn has_permission(&self, capability: Capability) -> bool {
        self.permissions
            .map(|p| p.get(capability))
            .unwrap_or(false)
    }

    pub fn default_route(&self) -> &'static str {
        default_route_for(self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::new("u-1", Some("a@zigma.io".into()))
            .with_access_token("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        let debug = format!("{:?}", session);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("payload"));

        let json = serde_json::to_string(&session).unwrap();
        assert!(!json.contains("access_token"));
    }

    #[test]
    fn test_metadata_role() {
        let session = Session::new("u-1", None).with_metadata(json!({ "role": "staff" }));
        assert_eq!(session.metadata_role(), Some(Role::Staff));

        let session = Session::new("u-1", None).with_metadata(json!({ "role": "owner" }));
        assert_eq!(session.metadata_role(), None);

        let session = Session::new("u-1", None);
        assert_eq!(session.metadata_role(), None);
    }

    #[test]
    fn test_state_permissions_follow_role() {
        let state = AuthState::authenticated(Session::new("u-1", None), Role::Admin);
        assert!(state.has_permission(Capability::SystemSettings));
        assert_eq!(state.default_route(), "/dashboard");
        assert!(!state.is_loading());

        let state = AuthState::anonymous();
        assert!(!state.has_permission(Capability::DownloadStatements));
        assert_eq!(state.default_route(), "/login");
    }

    #[test]
    fn test_loading_states() {
        assert!(AuthState::uninitialized().is_loading());
        assert!(AuthState::loading().is_loading());

        let state = AuthState::resolving(Session::new("u-2", None));
        assert!(state.is_loading());
        assert!(state.session().is_some());
        assert_eq!(state.role(), None);
        assert!(state.permissions().is_none());
    }
}
