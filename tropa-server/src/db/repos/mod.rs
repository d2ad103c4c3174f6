//! Per-entity repositories
//!
//! Each repository borrows the pool and exposes the operations the REST
//! layer needs. Mutations that need a pre-check (uniqueness, existence)
//! run check and write inside one transaction; any error rolls the
//! whole thing back.

pub mod activities;
pub mod documents;
pub mod messages;
pub mod pages;
pub mod sections;
pub mod users;

use std::io;

use chrono::{SecondsFormat, Utc};

pub use activities::{ActivityFilters, ActivityRecord, ActivityRepo, NewActivity, UpdateActivity};
pub use documents::{DocumentRecord, DocumentRepo, NewDocument};
pub use messages::{MessageRecord, MessageRepo, NewMessage};
pub use pages::{NewPage, PageRecord, PageRepo, UpdatePage};
pub use sections::{NewSection, SectionRecord, SectionRepo, UpdateSection};
pub use users::{NewUser, UpdateUser, UserFilters, UserRecord, UserRepo};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        source: io::Error,
    },

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} with {field} '{value}' already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
}

/// Current instant as a fixed-width RFC 3339 UTC string ("...Z").
///
/// Stored timestamps all use this form so lexicographic comparison in
/// SQL matches chronological order.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_fixed_width_utc() {
        let now = now_rfc3339();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2026-08-27T12:00:00Z".len());
    }
}
