//! Authentication: password hashing and bearer-token sessions

pub mod password;
pub mod sessions;

pub use password::{hash_password, verify_password};
pub use sessions::{Session, SessionRepo};
