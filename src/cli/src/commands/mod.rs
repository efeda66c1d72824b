pub mod access;
pub mod auth;
pub mod config;
pub mod health;
pub mod nav;
pub mod users;
