//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod email;
pub mod pagination;
pub mod role;
pub mod slug;
pub mod status;
pub mod validation;

pub use email::Email;
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use role::Role;
pub use slug::PageSlug;
pub use status::ActivityStatus;
pub use validation::ValidationError;
