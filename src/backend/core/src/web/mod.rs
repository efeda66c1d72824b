//! Local dashboard server: guarded page routes plus the JSON API used by the
//! `zigma` CLI.
//!
//! | Route                          | Purpose                                   |
//! |--------------------------------|-------------------------------------------|
//! | every route-table path         | page placeholder or guard redirect        |
//! | `GET /health`                  | liveness                                  |
//! | `GET /metrics`                 | Prometheus text                           |
//! | `GET /api/session`             | current auth state                        |
//! | `POST /api/auth/login`         | password sign-in                          |
//! | `POST /api/auth/oauth`         | start OAuth sign-in                       |
//! | `POST /api/auth/logout`        | sign out                                  |
//! | `GET /api/navigation`          | filtered sidebar menu                     |
//! | `GET /api/access?path=`        | navigation decision for a path            |
//! | `GET /api/users`               | profile listing (`search`, `role`)        |
//! | `PUT /api/users/:id/role`      | role change                               |

mod handlers;

use axum::{
    http::Uri,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::Result;
use crate::guard::{RequireAccessLayer, RouteSpec, ROUTES};
use crate::session::{AuthHandle, AuthState};
use crate::users::RoleAdministrator;

pub use handlers::{AccessReport, PageView, SessionView};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthHandle,
    pub users: RoleAdministrator,
    /// Where OAuth providers send the browser back to.
    pub oauth_redirect_url: String,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(auth: AuthHandle, oauth_redirect_url: impl Into<String>) -> Self {
        Self {
            users: RoleAdministrator::new(auth.clone()),
            auth,
            oauth_redirect_url: oauth_redirect_url.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/api/session", get(handlers::get_session))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/oauth", post(handlers::start_oauth))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/navigation", get(handlers::get_navigation))
        .route("/api/access", get(handlers::check_access))
        .route("/api/users", get(handlers::list_users))
        .route("/api/users/:id/role", put(handlers::update_user_role))
        .with_state(state.clone());

    page_routes(&state.auth)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// One guarded route per route-table entry.
fn page_routes(auth: &AuthHandle) -> Router {
    ROUTES.iter().fold(Router::new(), |router, route: &'static RouteSpec| {
        let page = move |Extension(state): Extension<AuthState>, uri: Uri| async move {
            Json(PageView::render(route, &state, uri.path()))
        };
        router.route(
            route.axum_path(),
            get(page).route_layer(RequireAccessLayer::for_route(auth.clone(), route)),
        )
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response Envelope
// ═══════════════════════════════════════════════════════════════════════════════

/// Success envelope. Failures use [`ErrorResponse`](crate::error::ErrorResponse),
/// which sets `error` and `error_code` instead of `data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }
}

/// Render a handler result in the envelope, with the error's HTTP status.
pub(crate) fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::success(data)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ZigmaError};

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let err = ZigmaError::new(ErrorCode::SelfRoleChange, "You cannot change your own role");
        let response = respond::<()>(Err(err));
        assert_eq!(response.status(), axum::http::StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "You cannot change your own role");
        assert_eq!(body["error_code"], "SelfRoleChange");
    }
}
