//! # Taskdeck Shared Library
//!
//! Domain types and business rules for the Taskdeck task manager, used by
//! the API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: users and tasks, with their SQL operations
//! - `store`: storage traits plus PostgreSQL and in-memory implementations
//! - `tasks`: the visibility and authorization engine for task operations
//! - `notify`: live notification fan-out to per-user channels
//! - `auth`: passwords, tokens, request authentication, access rules
//! - `db`: connection pool and migrations
//! - `validation`: field-level error reporting

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;
pub mod store;
pub mod tasks;
pub mod validation;

/// Current version of the Taskdeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
