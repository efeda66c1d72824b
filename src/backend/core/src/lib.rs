//! # ZIGMA Core
//!
//! Role and route authorization core of the ZIGMA investor-relations
//! dashboard.
//!
//! ## Architecture
//!
//! - **RBAC**: static capability matrix keyed by role, and each role's landing page
//! - **Session**: backend trait plus the resolver actor that keeps (session, role,
//!   permissions) current
//! - **Guard**: pure render/redirect decisions, the dashboard route table, and a
//!   tower layer for axum routes
//! - **Navigation**: sidebar menus filtered by permission
//! - **Users**: server-confirmed role administration
//! - **Web**: local dashboard server and JSON API
//! - **Telemetry**: structured logging and Prometheus counters

pub mod config;
pub mod error;
pub mod guard;
pub mod navigation;
pub mod rbac;
pub mod session;
pub mod telemetry;
pub mod users;
pub mod web;

pub use error::{ErrorCode, ErrorContext, ErrorSeverity, Result, ZigmaError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ErrorCode, ErrorContext, ErrorSeverity, Result, ZigmaError};
    pub use crate::guard::{
        evaluate, evaluate_nested, navigate, AccessView, GuardConfig, GuardDecision,
        NavigationOutcome, RequireAccessLayer,
    };
    pub use crate::navigation::{filter_navigation, navigation_for, NavigationItem};
    pub use crate::rbac::{default_route_for, Capability, PermissionSet, Role};
    pub use crate::session::{
        AuthBackend, AuthHandle, AuthState, InMemoryBackend, RestBackend, Session,
        SessionResolver, SessionStatus, UserId,
    };
    pub use crate::users::{RoleAdministrator, UserFilter};
}
