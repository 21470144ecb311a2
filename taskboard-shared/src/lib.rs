//! # Taskboard Shared Library
//!
//! Domain types, persistence and auth primitives used by the Taskboard API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Database models for users, projects, members, tasks, subtasks and notes
//! - `auth`: Credentials, tokens, the authentication gate and the project permission table
//! - `db`: Connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
