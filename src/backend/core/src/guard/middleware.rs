//! Tower layer that puts a route behind the guard.
//!
//! - `Loading` answers `200` with a neutral `{"status":"loading"}` body
//! - `Redirect` answers `303 See Other` with a `Location` header
//! - `Render` forwards the request with the evaluated [`AuthState`] snapshot
//!   in the request extensions

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

use super::table::{route_decision, RouteSpec};
use super::{evaluate_nested, GuardConfig, GuardDecision};
use crate::session::{AuthHandle, AuthState};
use crate::telemetry::metrics;

#[derive(Clone)]
enum AccessRule {
    Guards(Arc<[GuardConfig]>),
    Route(&'static RouteSpec),
}

impl AccessRule {
    fn decide(&self, state: &AuthState) -> GuardDecision {
        match self {
            Self::Guards(guards) => evaluate_nested(state, guards),
            Self::Route(route) => route_decision(state, route),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that wraps services with a guard chain.
///
/// # Example
///
/// ```rust,ignore
/// use zigma_core::guard::{GuardConfig, RequireAccessLayer};
///
/// let app = Router::new()
///     .route("/users", get(user_management))
///     .route_layer(RequireAccessLayer::new(
///         auth.clone(),
///         vec![GuardConfig::new().require(Capability::ManageUsers)],
///     ));
/// ```
#[derive(Clone)]
pub struct RequireAccessLayer {
    auth: AuthHandle,
    rule: AccessRule,
}

impl RequireAccessLayer {
    /// Guard chain evaluated outermost first.
    pub fn new(auth: AuthHandle, guards: Vec<GuardConfig>) -> Self {
        Self {
            auth,
            rule: AccessRule::Guards(guards.into()),
        }
    }

    /// Everything the route table says about `route`, public-page redirects
    /// included.
    pub fn for_route(auth: AuthHandle, route: &'static RouteSpec) -> Self {
        Self {
            auth,
            rule: AccessRule::Route(route),
        }
    }
}

impl<S> Layer<S> for RequireAccessLayer {
    type Service = RequireAccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAccessService {
            inner,
            auth: self.auth.clone(),
            rule: self.rule.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that evaluates the guard chain per request.
#[derive(Clone)]
pub struct RequireAccessService<S> {
    inner: S,
    auth: AuthHandle,
    rule: AccessRule,
}

impl<S> Service<Request<Body>> for RequireAccessService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let state = self.auth.state();
        let decision = self.rule.decide(&state);
        metrics::record_guard_decision(&decision);
        debug!(
            path = %request.uri().path(),
            decision = decision.kind(),
            role = ?state.role(),
            "Guard evaluated"
        );

        match decision {
            GuardDecision::Loading => Box::pin(async { Ok(loading_response()) }),
            GuardDecision::Redirect(to) => {
                Box::pin(async move { Ok(Redirect::to(to).into_response()) })
            }
            GuardDecision::Render => {
                request.extensions_mut().insert(state);
                let mut inner = self.inner.clone();
                // Call the instance that was polled ready.
                std::mem::swap(&mut self.inner, &mut inner);
                Box::pin(async move { inner.call(request).await })
            }
        }
    }
}

/// Neutral placeholder shown while the session is still resolving.
pub fn loading_response() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "loading" })),
    )
        .into_response()
}
