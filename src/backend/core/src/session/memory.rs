//! In-process auth/profile store.
//!
//! Used by the server's `memory` backend mode and throughout the tests. Events
//! fan out synchronously to every live sink, and a few switches let tests hold
//! or fail backend calls on demand.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Semaphore;
use tracing::debug;

use super::backend::{
    AuthBackend, AuthEventSink, OAuthProvider, OAuthRedirect, ProfileChange, ProfileEventSink,
    Subscription,
};
use super::{Profile, Session, UserId};
use crate::error::{ErrorCode, Result, ZigmaError};
use crate::rbac::Role;

struct Account {
    password: String,
    session: Session,
}

struct Inner {
    accounts: RwLock<HashMap<String, Account>>,
    profiles: RwLock<HashMap<UserId, Profile>>,
    current: RwLock<Option<Session>>,

    auth_sinks: Mutex<HashMap<u64, AuthEventSink>>,
    profile_sinks: Mutex<HashMap<u64, (UserId, ProfileEventSink)>>,
    next_sink_id: AtomicU64,
    next_user_seq: AtomicU64,
    epoch: DateTime<Utc>,

    fail_session_read: AtomicBool,
    fail_profile_lookup: AtomicBool,
    fail_sign_out: AtomicBool,
    /// Present while lookups are held; each permit lets one parked lookup
    /// through, in the order they arrived.
    lookup_gate: Mutex<Option<Arc<Semaphore>>>,

    auth_subscriptions_created: AtomicUsize,
    profile_subscriptions_created: AtomicUsize,
    profile_lookups: AtomicUsize,
}

/// In-memory [`AuthBackend`].
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts: RwLock::new(HashMap::new()),
                profiles: RwLock::new(HashMap::new()),
                current: RwLock::new(None),
                auth_sinks: Mutex::new(HashMap::new()),
                profile_sinks: Mutex::new(HashMap::new()),
                next_sink_id: AtomicU64::new(1),
                next_user_seq: AtomicU64::new(1),
                epoch: Utc::now(),
                fail_session_read: AtomicBool::new(false),
                fail_profile_lookup: AtomicBool::new(false),
                fail_sign_out: AtomicBool::new(false),
                lookup_gate: Mutex::new(None),
                auth_subscriptions_created: AtomicUsize::new(0),
                profile_subscriptions_created: AtomicUsize::new(0),
                profile_lookups: AtomicUsize::new(0),
            }),
        }
    }

    /// A store seeded with one account per role.
    ///
    /// | Email                | Password      | Role     |
    /// |----------------------|---------------|----------|
    /// | admin@zigma.io       | `admin123`    | admin    |
    /// | staff@zigma.io       | `staff123`    | staff    |
    /// | investor@zigma.io    | `investor123` | investor |
    pub fn demo() -> Self {
        let backend = Self::new();
        backend.add_user("admin@zigma.io", "admin123", Some("Avery Admin"), Role::Admin);
        backend.add_user("staff@zigma.io", "staff123", Some("Sam Staff"), Role::Staff);
        backend.add_user(
            "investor@zigma.io",
            "investor123",
            Some("Indra Investor"),
            Role::Investor,
        );
        backend
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an account with a profile record carrying `role`.
    pub fn add_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        role: Role,
    ) -> Session {
        let session = self.add_account(email, password, serde_json::json!({}));
        let seq = self.inner.next_user_seq.load(Ordering::SeqCst) as i64;
        let profile = Profile {
            id: session.user_id.clone(),
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
            role,
            avatar_url: None,
            created_at: self.inner.epoch + chrono::Duration::milliseconds(seq),
        };
        self.inner
            .profiles
            .write()
            .insert(session.user_id.clone(), profile);
        session
    }

    /// Register an account with no profile record; its role can only come
    /// from `metadata`.
    pub fn add_user_without_profile(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Session {
        self.add_account(email, password, metadata)
    }

    fn add_account(&self, email: &str, password: &str, metadata: serde_json::Value) -> Session {
        let seq = self.inner.next_user_seq.fetch_add(1, Ordering::SeqCst);
        let session = Session::new(format!("user-{}", seq), Some(email.to_string()))
            .with_metadata(metadata)
            .with_access_token(format!("memory-token-{}", seq));
        self.inner.accounts.write().insert(
            email.to_ascii_lowercase(),
            Account {
                password: password.to_string(),
                session: session.clone(),
            },
        );
        session
    }

    /// Set the session that `current_session` reports, without an event.
    pub fn restore_session(&self, session: Option<Session>) {
        *self.inner.current.write() = session;
    }

    /// Replace the current session and notify every auth listener.
    pub fn emit_auth_change(&self, session: Option<Session>) {
        *self.inner.current.write() = session.clone();
        let mut sinks = self.inner.auth_sinks.lock();
        sinks.retain(|_, sink| sink.send(session.clone()).is_ok());
    }

    /// Change a persisted role from outside (another administrator) and
    /// notify that identity's profile listeners.
    pub fn set_profile_role(&self, user_id: &UserId, role: Role) -> Result<Profile> {
        let profile = {
            let mut profiles = self.inner.profiles.write();
            let profile = profiles
                .get_mut(user_id)
                .ok_or_else(|| ZigmaError::not_found("Profile", user_id))?;
            profile.role = role;
            profile.clone()
        };
        self.notify_profile_change(user_id, role);
        Ok(profile)
    }

    fn notify_profile_change(&self, user_id: &UserId, role: Role) {
        let change = ProfileChange {
            user_id: user_id.clone(),
            role,
        };
        let mut sinks = self.inner.profile_sinks.lock();
        sinks.retain(|_, (watched, sink)| {
            if watched != user_id {
                return !sink.is_closed();
            }
            sink.send(change.clone()).is_ok()
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Failure injection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn fail_session_read(&self, fail: bool) {
        self.inner.fail_session_read.store(fail, Ordering::SeqCst);
    }

    pub fn fail_profile_lookups(&self, fail: bool) {
        self.inner.fail_profile_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.inner.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Park every profile lookup until [`release_profile_lookups`] is called.
    ///
    /// [`release_profile_lookups`]: Self::release_profile_lookups
    pub fn hold_profile_lookups(&self) {
        self.inner
            .lookup_gate
            .lock()
            .get_or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Let the oldest parked lookup finish; later ones stay held.
    pub fn release_one_profile_lookup(&self) {
        if let Some(gate) = self.inner.lookup_gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Stop holding and let every parked lookup finish.
    pub fn release_profile_lookups(&self) {
        if let Some(gate) = self.inner.lookup_gate.lock().take() {
            gate.close();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Live auth listeners.
    pub fn auth_subscriber_count(&self) -> usize {
        let mut sinks = self.inner.auth_sinks.lock();
        sinks.retain(|_, sink| !sink.is_closed());
        sinks.len()
    }

    /// Live profile listeners across all identities.
    pub fn profile_subscriber_count(&self) -> usize {
        let mut sinks = self.inner.profile_sinks.lock();
        sinks.retain(|_, (_, sink)| !sink.is_closed());
        sinks.len()
    }

    /// Live profile listeners for one identity.
    pub fn profile_subscribers_for(&self, user_id: &UserId) -> usize {
        self.inner
            .profile_sinks
            .lock()
            .values()
            .filter(|(watched, sink)| watched == user_id && !sink.is_closed())
            .count()
    }

    pub fn auth_subscriptions_created(&self) -> usize {
        self.inner.auth_subscriptions_created.load(Ordering::SeqCst)
    }

    pub fn profile_subscriptions_created(&self) -> usize {
        self.inner.profile_subscriptions_created.load(Ordering::SeqCst)
    }

    /// Completed profile lookups, successful or not.
    pub fn profile_lookup_count(&self) -> usize {
        self.inner.profile_lookups.load(Ordering::SeqCst)
    }

    fn next_sink_id(&self) -> u64 {
        self.inner.next_sink_id.fetch_add(1, Ordering::SeqCst)
    }
}

fn remove_auth_sink(inner: &Weak<Inner>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        inner.auth_sinks.lock().remove(&id);
    }
}

fn remove_profile_sink(inner: &Weak<Inner>, id: u64) {
    if let Some(inner) = inner.upgrade() {
        inner.profile_sinks.lock().remove(&id);
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>> {
        if self.inner.fail_session_read.load(Ordering::SeqCst) {
            return Err(ZigmaError::new(
                ErrorCode::BackendUnavailable,
                "Session store unavailable",
            ));
        }
        Ok(self.inner.current.read().clone())
    }

    fn subscribe_auth_changes(&self, sink: AuthEventSink) -> Subscription {
        let id = self.next_sink_id();
        self.inner.auth_sinks.lock().insert(id, sink);
        self.inner
            .auth_subscriptions_created
            .fetch_add(1, Ordering::SeqCst);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || remove_auth_sink(&weak, id))
    }

    async fn fetch_profile_role(&self, user_id: &UserId) -> Result<Option<Role>> {
        // Read first: a held lookup answers with the role as it was when the
        // request was issued, like a response still on the wire.
        let role = self.inner.profiles.read().get(user_id).map(|p| p.role);

        let gate = self.inner.lookup_gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate means everything was released.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.inner.profile_lookups.fetch_add(1, Ordering::SeqCst);
        debug!(user_id = %user_id, "In-memory profile lookup");

        if self.inner.fail_profile_lookup.load(Ordering::SeqCst) {
            return Err(ZigmaError::backend(
                "Profile lookup failed",
                format!("injected failure for {}", user_id),
            ));
        }
        Ok(role)
    }

    fn subscribe_profile_changes(&self, user_id: &UserId, sink: ProfileEventSink) -> Subscription {
        let id = self.next_sink_id();
        self.inner
            .profile_sinks
            .lock()
            .insert(id, (user_id.clone(), sink));
        self.inner
            .profile_subscriptions_created
            .fetch_add(1, Ordering::SeqCst);

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || remove_profile_sink(&weak, id))
    }

    async fn sign_out(&self) -> Result<()> {
        if self.inner.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ZigmaError::new(
                ErrorCode::BackendUnavailable,
                "Sign-out failed, please try again",
            ));
        }
        self.emit_auth_change(None);
        Ok(())
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<OAuthRedirect> {
        let url = reqwest::Url::parse_with_params(
            "memory://auth/v1/authorize",
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| ZigmaError::invalid_input("Invalid OAuth redirect").with_source(e))?;

        Ok(OAuthRedirect {
            provider,
            url: url.to_string(),
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = {
            let accounts = self.inner.accounts.read();
            match accounts.get(&email.trim().to_ascii_lowercase()) {
                Some(account) if account.password == password => account.session.clone(),
                _ => {
                    return Err(ZigmaError::new(
                        ErrorCode::InvalidCredentials,
                        "Invalid email or password",
                    ))
                }
            }
        };
        self.emit_auth_change(Some(session.clone()));
        Ok(session)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.inner.profiles.read().values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn update_profile_role(&self, user_id: &UserId, role: Role) -> Result<Profile> {
        self.set_profile_role(user_id, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_password_sign_in_emits_auth_change() {
        let backend = InMemoryBackend::demo();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = backend.subscribe_auth_changes(tx);

        let session = backend
            .sign_in_with_password("Admin@Zigma.io", "admin123")
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), Some(session.clone()));
        assert_eq!(backend.current_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let backend = InMemoryBackend::demo();
        let err = backend
            .sign_in_with_password("admin@zigma.io", "nope")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert_eq!(backend.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_sink() {
        let backend = InMemoryBackend::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let sub = backend.subscribe_auth_changes(tx);
        assert_eq!(backend.auth_subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(backend.auth_subscriber_count(), 0);
        assert_eq!(backend.auth_subscriptions_created(), 1);
    }

    #[tokio::test]
    async fn test_profile_changes_reach_only_watched_identity() {
        let backend = InMemoryBackend::new();
        let alice = backend.add_user("alice@zigma.io", "pw", None, Role::Staff);
        let bob = backend.add_user("bob@zigma.io", "pw", None, Role::Investor);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = backend.subscribe_profile_changes(&alice.user_id, tx);

        backend.set_profile_role(&bob.user_id, Role::Staff).unwrap();
        backend.set_profile_role(&alice.user_id, Role::Admin).unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.user_id, alice.user_id);
        assert_eq!(change.role, Role::Admin);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_profiles_listed_newest_first() {
        let backend = InMemoryBackend::demo();
        let profiles = backend.list_profiles().await.unwrap();
        let emails: Vec<_> = profiles.iter().map(|p| p.email.as_str()).collect();
        assert_eq!(
            emails,
            vec!["investor@zigma.io", "staff@zigma.io", "admin@zigma.io"]
        );
    }

    #[tokio::test]
    async fn test_oauth_redirect_url() {
        let backend = InMemoryBackend::new();
        let redirect = backend
            .sign_in_with_oauth(OAuthProvider::Google, "http://localhost:5173/auth/callback")
            .await
            .unwrap();
        assert!(redirect.url.contains("provider=google"));
        assert!(redirect
            .url
            .contains("redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fauth%2Fcallback"));
    }

    #[tokio::test]
    async fn test_failing_lookup() {
        let backend = InMemoryBackend::demo();
        backend.fail_profile_lookups(true);
        let user = UserId::from("user-1");
        let err = backend.fetch_profile_role(&user).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BackendError);
        assert_eq!(backend.profile_lookup_count(), 1);
    }
}
