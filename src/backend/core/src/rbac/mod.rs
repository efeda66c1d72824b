//! Role-based access control: the static capability matrix.
//!
//! This module provides:
//! - **Roles**: the three fixed dashboard roles
//! - **Permissions**: the `Capability` enum and one complete `PermissionSet` per role
//! - **Routes**: canonical paths and each role's landing page
//!
//! Everything here is pure and fixed at compile time; the session resolver,
//! the route guard and the navigation filter all read from it.
//!
//! # Usage
//!
//! ```rust
//! use zigma_core::rbac::{default_route_for, Capability, Role};
//!
//! assert!(Role::Admin.has_capability(Capability::ManageUsers));
//! assert!(!Role::Staff.has_capability(Capability::DeleteFund));
//! assert_eq!(default_route_for(Some(Role::Investor)), "/investor/dashboard");
//! ```

pub mod permissions;
pub mod roles;
pub mod routes;

pub use permissions::{Capability, PermissionSet};
pub use roles::Role;
pub use routes::default_route_for;
