//! The auth/profile service consumed by the session resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

use super::{Profile, Session, UserId};
use crate::error::{ErrorCode, Result, ZigmaError};
use crate::rbac::Role;

/// Receives every auth-state change: `Some` for a (new or refreshed) session,
/// `None` when the session ended.
pub type AuthEventSink = mpsc::UnboundedSender<Option<Session>>;

/// Receives persisted-role changes for one identity.
pub type ProfileEventSink = mpsc::UnboundedSender<ProfileChange>;

/// A persisted profile role changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChange {
    pub user_id: UserId,
    pub role: Role,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Subscription
// ═══════════════════════════════════════════════════════════════════════════════

/// Handle to a backend listener. Unsubscribes on `unsubscribe()` or on drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OAuth
// ═══════════════════════════════════════════════════════════════════════════════

/// External identity providers accepted for redirect sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = ZigmaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            other => Err(ZigmaError::new(
                ErrorCode::InvalidInput,
                format!("Unsupported OAuth provider: {}", other),
            )),
        }
    }
}

/// Where the caller must send the browser to continue an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    pub url: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Backend Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Remote auth and profile store.
///
/// Implementations deliver auth-state changes and profile-role changes by
/// sending into the sinks they are given; dropping the returned
/// [`Subscription`] stops delivery.
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    /// The active session, if any.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Listen for auth-state changes.
    fn subscribe_auth_changes(&self, sink: AuthEventSink) -> Subscription;

    /// Role persisted on the user's profile record. `Ok(None)` when the
    /// record is missing or carries no role.
    async fn fetch_profile_role(&self, user_id: &UserId) -> Result<Option<Role>>;

    /// Listen for persisted-role changes of one identity.
    fn subscribe_profile_changes(&self, user_id: &UserId, sink: ProfileEventSink) -> Subscription;

    async fn sign_out(&self) -> Result<()>;

    /// Start a redirect sign-in; the session arrives later as an auth change.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<OAuthRedirect>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Every profile, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    /// Persist a new role and return the confirmed record.
    async fn update_profile_role(&self, user_id: &UserId, role: Role) -> Result<Profile>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_subscription_cancels_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_oauth_provider_parse() {
        assert_eq!("Google".parse::<OAuthProvider>().unwrap(), OAuthProvider::Google);
        let err = "myspace".parse::<OAuthProvider>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }
}
