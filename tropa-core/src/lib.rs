//! tropa-core: shared types for the tropa scout-group portal
//!
//! Holds the pieces both the server and the CLI need: configuration
//! loading, the library error type, the markdown renderer used for CMS
//! pages, and slug helpers.

pub mod config;
pub mod error;
pub mod markdown;
pub mod slug;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use markdown::render_markdown;
pub use slug::slugify;
