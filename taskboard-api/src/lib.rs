//! # Taskboard API Server Library
//!
//! HTTP layer of the Taskboard backend: accounts, projects with role-based
//! membership, tasks, subtasks and notes.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `cookies`: Token cookies
//! - `error`: Error handling and the error envelope
//! - `extract`: JSON and path extractors that reject with the error envelope
//! - `mail`: Outgoing mail transport
//! - `middleware`: Security headers
//! - `response`: The success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod response;
pub mod routes;
