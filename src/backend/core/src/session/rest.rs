//! REST client for a Supabase-compatible auth and profile service.
//!
//! | Operation            | Request                                              |
//! |----------------------|------------------------------------------------------|
//! | password sign-in     | `POST /auth/v1/token?grant_type=password`            |
//! | session check        | `GET /auth/v1/user`                                  |
//! | sign-out             | `POST /auth/v1/logout`                               |
//! | OAuth redirect       | `/auth/v1/authorize?provider=..&redirect_to=..`      |
//! | profile role         | `GET /rest/v1/profiles?id=eq.{id}&select=role`       |
//! | profile list         | `GET /rest/v1/profiles?select=*&order=created_at.desc` |
//! | role update          | `PATCH /rest/v1/profiles?id=eq.{id}`                 |
//!
//! Every request carries the `apikey` header and a bearer token (the session
//! token when signed in, the anon key otherwise). Auth changes are emitted
//! locally after sign-in and sign-out; profile-role changes are found by
//! polling.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::backend::{
    AuthBackend, AuthEventSink, OAuthProvider, OAuthRedirect, ProfileChange, ProfileEventSink,
    Subscription,
};
use super::{Profile, Session, UserId};
use crate::config::BackendConfig;
use crate::error::{ErrorCode, Result, ZigmaError};
use crate::rbac::Role;
use crate::telemetry::SensitiveFieldRedactor;

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: Option<String>,
}

impl UserPayload {
    fn into_session(self, access_token: String) -> Session {
        Session::new(self.id, self.email)
            .with_metadata(self.user_metadata)
            .with_access_token(access_token)
    }
}

struct RestInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    poll_interval: Duration,
    session: RwLock<Option<Session>>,
    auth_sinks: Mutex<HashMap<u64, AuthEventSink>>,
    next_sink_id: AtomicU64,
}

/// [`AuthBackend`] over HTTP.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestInner>,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ZigmaError::new(ErrorCode::ConfigurationError, "Failed to build HTTP client")
                    .with_source(e)
            })?;

        Ok(Self {
            inner: Arc::new(RestInner {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                anon_key: anon_key.into(),
                poll_interval,
                session: RwLock::new(None),
                auth_sinks: Mutex::new(HashMap::new()),
                next_sink_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            ZigmaError::new(ErrorCode::MissingConfiguration, "backend.url is required")
        })?;
        let anon_key = config.anon_key.as_deref().ok_or_else(|| {
            ZigmaError::new(ErrorCode::MissingConfiguration, "backend.anon_key is required")
        })?;
        Self::new(
            url,
            anon_key,
            config.request_timeout,
            config.profile_poll_interval,
        )
    }

    /// Resume a session from a previously issued access token. The token is
    /// verified on the next `current_session` call.
    pub fn restore_session(&self, access_token: impl Into<String>) {
        let placeholder = Session::new("", None).with_access_token(access_token);
        *self.inner.session.write() = Some(placeholder);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .inner
            .session
            .read()
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .unwrap_or_else(|| self.inner.anon_key.clone());

        self.inner
            .client
            .request(method, self.url(path))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }

    fn emit(&self, session: Option<Session>) {
        let mut sinks = self.inner.auth_sinks.lock();
        sinks.retain(|_, sink| sink.send(session.clone()).is_ok());
    }

    async fn fail_with_body(response: reqwest::Response, operation: &str) -> ZigmaError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = SensitiveFieldRedactor::global().redact_value(&body);
        debug!(status = %status, body = %body, operation, "Backend request failed");

        let code = match status {
            StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
            StatusCode::FORBIDDEN => ErrorCode::Forbidden,
            StatusCode::NOT_FOUND => ErrorCode::RecordNotFound,
            s if s.is_server_error() => ErrorCode::BackendUnavailable,
            _ => ErrorCode::BackendError,
        };
        ZigmaError::with_internal(
            code,
            format!("{} failed", operation),
            format!("HTTP {}: {}", status, body),
        )
    }
}

/// PostgREST equality filter on the profile id. Passed as a query pair so the
/// id is percent-encoded and cannot add filters of its own.
fn id_filter(user_id: &UserId) -> String {
    format!("eq.{}", user_id)
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn current_session(&self) -> Result<Option<Session>> {
        let has_token = self
            .inner
            .session
            .read()
            .as_ref()
            .map(|s| s.access_token.is_some())
            .unwrap_or(false);
        if !has_token {
            return Ok(None);
        }

        let response = self.request(Method::GET, "/auth/v1/user").send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            info!("Stored session was rejected; continuing signed out");
            *self.inner.session.write() = None;
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::fail_with_body(response, "Session check").await);
        }

        let user: UserPayload = response.json().await?;
        let mut guard = self.inner.session.write();
        let token = guard
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .unwrap_or_default();
        let session = user.into_session(token);
        *guard = Some(session.clone());
        Ok(Some(session))
    }

    fn subscribe_auth_changes(&self, sink: AuthEventSink) -> Subscription {
        let id = self.inner.next_sink_id.fetch_add(1, Ordering::SeqCst);
        self.inner.auth_sinks.lock().insert(id, sink);

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.auth_sinks.lock().remove(&id);
            }
        })
    }

    async fn fetch_profile_role(&self, user_id: &UserId) -> Result<Option<Role>> {
        let response = self
            .request(Method::GET, "/rest/v1/profiles")
            .query(&[("id", id_filter(user_id)), ("select", "role".to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail_with_body(response, "Profile lookup").await);
        }

        let rows: Vec<RoleRow> = response.json().await?;
        let Some(raw) = rows.into_iter().next().and_then(|row| row.role) else {
            return Ok(None);
        };
        match raw.parse::<Role>() {
            Ok(role) => Ok(Some(role)),
            Err(_) => {
                warn!(user_id = %user_id, role = %raw, "Profile carries an unknown role");
                Ok(None)
            }
        }
    }

    fn subscribe_profile_changes(&self, user_id: &UserId, sink: ProfileEventSink) -> Subscription {
        let backend = self.clone();
        let user_id = user_id.clone();
        let period = self.inner.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_seen: Option<Role> = None;

            loop {
                ticker.tick().await;
                if sink.is_closed() {
                    break;
                }
                match backend.fetch_profile_role(&user_id).await {
                    Ok(Some(role)) => {
                        if last_seen.is_some_and(|previous| previous != role) {
                            let change = ProfileChange {
                                user_id: user_id.clone(),
                                role,
                            };
                            if sink.send(change).is_err() {
                                break;
                            }
                        }
                        last_seen = Some(role);
                    }
                    Ok(None) => {}
                    Err(e) => debug!(user_id = %user_id, error = %e, "Profile poll failed"),
                }
            }
        });

        let abort = task.abort_handle();
        Subscription::new(move || abort.abort())
    }

    async fn sign_out(&self) -> Result<()> {
        let signed_in = self.inner.session.read().is_some();
        if signed_in {
            let response = self.request(Method::POST, "/auth/v1/logout").send().await?;
            if !response.status().is_success() {
                return Err(Self::fail_with_body(response, "Sign-out").await);
            }
        }

        *self.inner.session.write() = None;
        self.emit(None);
        Ok(())
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<OAuthRedirect> {
        let url = reqwest::Url::parse_with_params(
            &self.url("/auth/v1/authorize"),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| {
            ZigmaError::new(ErrorCode::InvalidConfiguration, "Invalid backend URL").with_source(e)
        })?;

        Ok(OAuthRedirect {
            provider,
            url: url.to_string(),
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .inner
            .client
            .post(self.url("/auth/v1/token?grant_type=password"))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(&self.inner.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(ZigmaError::new(
                    ErrorCode::InvalidCredentials,
                    "Invalid email or password",
                ));
            }
            _ => return Err(Self::fail_with_body(response, "Sign-in").await),
        }

        let token: TokenResponse = response.json().await?;
        let session = token.user.into_session(token.access_token);
        *self.inner.session.write() = Some(session.clone());
        self.emit(Some(session.clone()));
        Ok(session)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        let response = self
            .request(Method::GET, "/rest/v1/profiles?select=*&order=created_at.desc")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail_with_body(response, "Profile listing").await);
        }
        Ok(response.json().await?)
    }

    async fn update_profile_role(&self, user_id: &UserId, role: Role) -> Result<Profile> {
        let response = self
            .request(Method::PATCH, "/rest/v1/profiles")
            .query(&[("id", id_filter(user_id))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "role": role }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail_with_body(response, "Role update").await);
        }

        let rows: Vec<Profile> = response.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ZigmaError::not_found("Profile", user_id))
    }
}
