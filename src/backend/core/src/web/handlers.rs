use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use super::{respond, AppState};
use crate::error::{ErrorCode, ZigmaError};
use crate::guard::{navigate, NavigationOutcome, RouteSpec};
use crate::navigation::{visible_navigation, NavigationItem};
use crate::rbac::{PermissionSet, Role};
use crate::session::{AuthState, OAuthProvider, SessionStatus, UserId};
use crate::users::UserFilter;

/// How long a sign-in waits for the resolver to publish the new identity.
const SIGN_IN_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

// ═══════════════════════════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════════════════════════

/// Public shape of the auth state. Never carries the access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub loading: bool,
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub permissions: Option<PermissionSet>,
    pub default_route: String,
}

impl From<&AuthState> for SessionView {
    fn from(state: &AuthState) -> Self {
        Self {
            status: state.status(),
            loading: state.is_loading(),
            user_id: state.user_id().cloned(),
            email: state.session().and_then(|s| s.email.clone()),
            role: state.role(),
            permissions: state.permissions().copied(),
            default_route: state.default_route().to_string(),
        }
    }
}

/// Placeholder body for a rendered page.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub page: &'static str,
    pub path: String,
    pub role: Option<Role>,
    pub navigation: Vec<NavigationItem>,
}

impl PageView {
    pub fn render(route: &'static RouteSpec, state: &AuthState, path: &str) -> Self {
        Self {
            page: route.page,
            path: path.to_string(),
            role: state.role(),
            navigation: visible_navigation(state),
        }
    }
}

/// Answer of `/api/access`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessReport {
    pub path: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "session": state.auth.state().status().as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auth Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn get_session(State(state): State<AppState>) -> Response {
    respond(Ok(SessionView::from(&state.auth.state())))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let session = match state.auth.sign_in_with_password(&req.email, &req.password).await {
        Ok(session) => session,
        Err(e) => return respond::<SessionView>(Err(e)),
    };

    let settled =
        tokio::time::timeout(SIGN_IN_SETTLE_TIMEOUT, state.auth.wait_for_identity(&session.user_id))
            .await;
    let snapshot = match settled {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => return respond::<SessionView>(Err(e)),
        Err(_) => {
            warn!(user_id = %session.user_id, "Sign-in did not settle in time");
            state.auth.state()
        }
    };
    respond(Ok(SessionView::from(&snapshot)))
}

#[derive(Deserialize, Default)]
pub struct OAuthRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

pub async fn start_oauth(State(state): State<AppState>, Json(req): Json<OAuthRequest>) -> Response {
    let provider = match req.provider.as_deref().unwrap_or("google").parse::<OAuthProvider>() {
        Ok(provider) => provider,
        Err(e) => return respond::<()>(Err(e)),
    };
    let redirect_to = req
        .redirect_to
        .unwrap_or_else(|| state.oauth_redirect_url.clone());

    respond(state.auth.sign_in_with_oauth(provider, &redirect_to).await)
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let result = state
        .auth
        .sign_out()
        .await
        .map(|()| SessionView::from(&state.auth.state()));
    respond(result)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Access Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn get_navigation(State(state): State<AppState>) -> Response {
    respond(Ok(visible_navigation(&state.auth.state())))
}

#[derive(Deserialize)]
pub struct AccessQuery {
    pub path: String,
}

pub async fn check_access(
    State(state): State<AppState>,
    Query(query): Query<AccessQuery>,
) -> Response {
    let snapshot = state.auth.state();
    let outcome = navigate(&snapshot, &query.path);

    let (page, redirect_to) = match &outcome {
        NavigationOutcome::Render(matched) | NavigationOutcome::Loading(matched) => {
            (Some(matched.route.page.to_string()), None)
        }
        NavigationOutcome::Redirect(to) => (None, Some(to.to_string())),
        NavigationOutcome::NotFound => (None, None),
    };

    respond(Ok(AccessReport {
        path: query.path,
        outcome: outcome.kind().to_string(),
        page,
        redirect_to,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// User Management Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Response {
    respond(state.users.list_users(&filter).await)
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Response {
    let role = match req.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return respond::<()>(Err(e)),
    };
    if id.trim().is_empty() {
        return respond::<()>(Err(ZigmaError::new(
            ErrorCode::InvalidInput,
            "User id is required",
        )));
    }

    respond(state.users.update_user_role(&UserId::from(id), role).await)
}
