//! tropa-server: HTTP service for the tropa scout-group portal
//!
//! REST API over a single-file SQLite database: users, sections,
//! activities (calendar), messages, CMS pages, and file uploads, with
//! bearer-token sessions and role-based permissions.

pub mod auth;
pub mod db;
pub mod http;
pub mod models;

pub use http::{run_server, ApiError, AppState};
