//! # domains
//!
//! Entities, error taxonomy, request context and port traits for the
//! hunt forum. No I/O lives here.

pub mod context;
pub mod errors;
pub mod models;
pub mod ports;

pub use context::*;
pub use errors::*;
pub use models::*;
pub use ports::*;

/// Maximum length of a post body, in characters.
pub const MAX_POST_CHARS: usize = 10_000;

/// Minutes during which an author may edit their own post.
pub const DEFAULT_EDIT_WINDOW_MINUTES: i64 = 15;
