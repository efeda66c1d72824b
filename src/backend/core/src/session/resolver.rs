//! Session resolver actor.
//!
//! One task owns the (session, role, permissions) triple. Everything that can
//! change it (auth events, profile-role events, finished role lookups,
//! sign-out) arrives as a message and is applied in order; readers get whole
//! [`AuthState`] snapshots through a `watch` channel.
//!
//! Role lookups run on spawned tasks and are tagged with the epoch and user
//! they were issued for. The epoch moves on every session-level change, so a
//! lookup that finishes after the session moved on is dropped instead of
//! overwriting newer state.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AuthBackend, OAuthProvider, OAuthRedirect, ProfileChange, Subscription};
use super::{AuthState, Session, SessionStatus, UserId};
use crate::error::{Result, ZigmaError};
use crate::rbac::{Capability, Role};
use crate::telemetry::metrics;

enum Command {
    Initialize(oneshot::Sender<()>),
    RoleResolved {
        epoch: u64,
        user_id: UserId,
        role: Role,
    },
    SignOut(oneshot::Sender<Result<()>>),
    Teardown,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Owner of the resolver task.
///
/// Create one per application, hand out [`AuthHandle`]s, and call
/// [`teardown`](Self::teardown) on shutdown.
pub struct SessionResolver {
    handle: AuthHandle,
    task: Option<JoinHandle<()>>,
}

impl SessionResolver {
    /// Spawn the resolver task. Must be called inside a tokio runtime.
    ///
    /// The resolver starts `Uninitialized`; nothing touches the backend until
    /// [`AuthHandle::initialize`] is called.
    pub fn create(backend: Arc<dyn AuthBackend>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AuthState::uninitialized());

        let actor = ResolverActor {
            backend: backend.clone(),
            commands: command_rx,
            self_tx: command_tx.clone(),
            state_tx,
            epoch: 0,
            initialized: false,
            pending_init: Vec::new(),
            auth_subscription: None,
            auth_rx: None,
            profile_subscription: None,
            profile_rx: None,
        };
        let task = tokio::spawn(actor.run());

        Self {
            handle: AuthHandle {
                commands: command_tx,
                state: state_rx,
                backend,
            },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> AuthHandle {
        self.handle.clone()
    }

    /// Stop the resolver and drop every backend subscription it holds.
    pub async fn teardown(mut self) {
        let _ = self.handle.commands.send(Command::Teardown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session resolver task ended abnormally");
            }
        }
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            let _ = self.handle.commands.send(Command::Teardown);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Handle
// ═══════════════════════════════════════════════════════════════════════════════

/// Cloneable query and command surface of a running resolver.
#[derive(Clone)]
pub struct AuthHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<AuthState>,
    backend: Arc<dyn AuthBackend>,
}

impl AuthHandle {
    /// Current snapshot.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    /// False while no permission set is resolved.
    pub fn has_permission(&self, capability: Capability) -> bool {
        self.state.borrow().has_permission(capability)
    }

    pub fn default_route(&self) -> &'static str {
        self.state.borrow().default_route()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.state.borrow().user_id().cloned()
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    /// Subscribe to auth changes and resolve the initial session.
    ///
    /// Resolves once the first settled state (anonymous or authenticated) is
    /// published. Later calls wait for the same condition and never
    /// subscribe again.
    pub async fn initialize(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Initialize(tx))?;
        rx.await.map_err(|_| ZigmaError::resolver_shut_down())
    }

    /// Wait until the state is no longer loading.
    pub async fn wait_until_settled(&self) -> Result<AuthState> {
        self.wait_for(|state| !state.is_loading()).await
    }

    /// Wait until `user_id` is the settled, authenticated identity.
    pub async fn wait_for_identity(&self, user_id: &UserId) -> Result<AuthState> {
        self.wait_for(|state| {
            state.status() == SessionStatus::Authenticated && state.user_id() == Some(user_id)
        })
        .await
    }

    async fn wait_for(&self, predicate: impl FnMut(&AuthState) -> bool) -> Result<AuthState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ZigmaError::resolver_shut_down())?
            .clone();
        Ok(state)
    }

    /// Password sign-in. The new session reaches the resolver as an auth
    /// change; a failure leaves the current state untouched.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        match self.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "Password sign-in succeeded");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Password sign-in failed");
                Err(e)
            }
        }
    }

    /// Start an OAuth sign-in and return the provider URL to follow.
    pub async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<OAuthRedirect> {
        let redirect = self.backend.sign_in_with_oauth(provider, redirect_to).await?;
        info!(provider = %provider, redirect_to = %redirect_to, "OAuth sign-in started");
        Ok(redirect)
    }

    /// Sign out. On success the state is anonymous by the time this returns;
    /// on failure the session is kept.
    pub async fn sign_out(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SignOut(tx))?;
        rx.await.map_err(|_| ZigmaError::resolver_shut_down())?
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ZigmaError::resolver_shut_down())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor
// ═══════════════════════════════════════════════════════════════════════════════

struct ResolverActor {
    backend: Arc<dyn AuthBackend>,
    commands: mpsc::UnboundedReceiver<Command>,
    self_tx: mpsc::UnboundedSender<Command>,
    state_tx: watch::Sender<AuthState>,

    epoch: u64,
    initialized: bool,
    pending_init: Vec<oneshot::Sender<()>>,

    auth_subscription: Option<Subscription>,
    auth_rx: Option<mpsc::UnboundedReceiver<Option<Session>>>,
    // At most one, always for the current identity.
    profile_subscription: Option<(UserId, Subscription)>,
    profile_rx: Option<mpsc::UnboundedReceiver<ProfileChange>>,
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl ResolverActor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Teardown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                event = recv_or_pending(&mut self.auth_rx) => match event {
                    Some(session) => self.apply_auth_change(session),
                    None => self.auth_rx = None,
                },
                change = recv_or_pending(&mut self.profile_rx) => match change {
                    Some(change) => self.apply_profile_change(change),
                    None => self.profile_rx = None,
                },
            }
        }

        self.profile_subscription = None;
        self.auth_subscription = None;
        debug!("Session resolver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Initialize(reply) => self.initialize(reply).await,
            Command::RoleResolved {
                epoch,
                user_id,
                role,
            } => self.apply_resolved_role(epoch, user_id, role),
            Command::SignOut(reply) => {
                let result = self.sign_out().await;
                let _ = reply.send(result);
            }
            Command::Teardown => {}
        }
    }

    fn current(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    fn publish(&mut self, state: AuthState) {
        if *self.state_tx.borrow() != state {
            info!(
                status = state.status().as_str(),
                user_id = ?state.user_id().map(UserId::as_str),
                role = ?state.role(),
                epoch = self.epoch,
                "Auth state changed"
            );
            metrics::record_transition(state.status());
            self.state_tx.send_replace(state);
        }

        if !self.state_tx.borrow().is_loading() {
            for waiter in self.pending_init.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    async fn initialize(&mut self, reply: oneshot::Sender<()>) {
        self.pending_init.push(reply);
        if self.initialized {
            // Flushes the waiter right away if already settled.
            let current = self.current();
            self.publish(current);
            return;
        }
        self.initialized = true;
        self.publish(AuthState::loading());

        let (tx, rx) = mpsc::unbounded_channel();
        self.auth_subscription = Some(self.backend.subscribe_auth_changes(tx));
        self.auth_rx = Some(rx);

        match self.backend.current_session().await {
            Ok(session) => self.apply_auth_change(session),
            Err(e) => {
                warn!(error = %e, "Failed to read the current session; continuing signed out");
                self.clear_session();
            }
        }
    }

    fn apply_auth_change(&mut self, session: Option<Session>) {
        let Some(session) = session else {
            self.clear_session();
            return;
        };

        let current = self.current();
        if current.user_id() == Some(&session.user_id) {
            // Same identity: keep the known role visible while re-resolving.
            self.publish(AuthState {
                session: Some(session.clone()),
                ..current
            });
        } else {
            self.epoch += 1;
            self.watch_profile(&session.user_id);
            self.publish(AuthState::resolving(session.clone()));
        }
        self.spawn_resolution(session);
    }

    fn clear_session(&mut self) {
        self.profile_subscription = None;
        self.profile_rx = None;

        let current = self.current();
        if current.status() == SessionStatus::Anonymous {
            return;
        }
        self.epoch += 1;
        self.publish(AuthState::anonymous());
    }

    fn watch_profile(&mut self, user_id: &UserId) {
        if matches!(&self.profile_subscription, Some((watched, _)) if watched == user_id) {
            return;
        }
        // Drop the old listener before opening the new one.
        self.profile_subscription = None;

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.backend.subscribe_profile_changes(user_id, tx);
        self.profile_subscription = Some((user_id.clone(), subscription));
        self.profile_rx = Some(rx);
        debug!(user_id = %user_id, "Watching profile role");
    }

    fn spawn_resolution(&self, session: Session) {
        let backend = self.backend.clone();
        let commands = self.self_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            let role = resolve_role(backend.as_ref(), &session).await;
            let _ = commands.send(Command::RoleResolved {
                epoch,
                user_id: session.user_id,
                role,
            });
        });
    }

    fn apply_resolved_role(&mut self, epoch: u64, user_id: UserId, role: Role) {
        let current = self.current();
        let session = match current.session() {
            Some(session) if epoch == self.epoch && session.user_id == user_id => session.clone(),
            _ => {
                debug!(
                    user_id = %user_id,
                    issued_epoch = epoch,
                    current_epoch = self.epoch,
                    "Discarding stale role resolution"
                );
                metrics::record_stale_resolution();
                return;
            }
        };
        self.publish(AuthState::authenticated(session, role));
    }

    fn apply_profile_change(&mut self, change: ProfileChange) {
        let current = self.current();
        let session = match current.session() {
            Some(session) if session.user_id == change.user_id => session.clone(),
            _ => {
                debug!(user_id = %change.user_id, "Ignoring profile change for inactive identity");
                return;
            }
        };

        // Lookups already in flight for this identity predate the change.
        self.epoch += 1;
        info!(user_id = %change.user_id, role = %change.role, "Profile role changed");
        self.publish(AuthState::authenticated(session, change.role));
    }

    async fn sign_out(&mut self) -> Result<()> {
        match self.backend.sign_out().await {
            Ok(()) => {
                self.clear_session();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-out failed; keeping the current session");
                Err(e)
            }
        }
    }
}

/// Role for a session: the persisted profile role, else `user_metadata.role`,
/// else investor. Lookup failures are logged and fall through.
pub async fn resolve_role(backend: &dyn AuthBackend, session: &Session) -> Role {
    match backend.fetch_profile_role(&session.user_id).await {
        Ok(Some(role)) => return role,
        Ok(None) => {
            debug!(user_id = %session.user_id, "No profile role; using identity metadata");
        }
        Err(e) => {
            warn!(
                user_id = %session.user_id,
                error = %e,
                "Profile role lookup failed; using identity metadata"
            );
        }
    }
    session.metadata_role().unwrap_or(Role::Investor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemoryBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_prefers_profile() {
        let backend = InMemoryBackend::new();
        let session = backend
            .add_user("a@zigma.io", "pw", None, Role::Staff)
            .with_metadata(json!({ "role": "admin" }));
        assert_eq!(resolve_role(&backend, &session).await, Role::Staff);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_metadata_then_investor() {
        let backend = InMemoryBackend::new();
        let session =
            backend.add_user_without_profile("m@zigma.io", "pw", json!({ "role": "staff" }));
        assert_eq!(resolve_role(&backend, &session).await, Role::Staff);

        let session = backend.add_user_without_profile("n@zigma.io", "pw", json!({}));
        assert_eq!(resolve_role(&backend, &session).await, Role::Investor);
    }

    #[tokio::test]
    async fn test_resolve_survives_lookup_failure() {
        let backend = InMemoryBackend::new();
        let session = backend
            .add_user("f@zigma.io", "pw", None, Role::Admin)
            .with_metadata(json!({ "role": "staff" }));
        backend.fail_profile_lookups(true);
        assert_eq!(resolve_role(&backend, &session).await, Role::Staff);
    }
}
