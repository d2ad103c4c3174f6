//! Database layer - connection pool, schema, repositories
//!
//! # Design Principles
//!
//! - One SQLite file, WAL mode, small pool - no per-request connections
//! - Invariants (UNIQUE email/slug, CHECK ranges) live in the schema
//! - Every statement uses bound parameters
//! - Multi-step mutations run inside a transaction

pub mod pool;
pub mod repos;
pub mod schema;
pub mod slow;

pub use pool::open_pool;
pub use repos::DbError;
pub use schema::init_schema;
pub use slow::{ExecResult, QueryTimer};
