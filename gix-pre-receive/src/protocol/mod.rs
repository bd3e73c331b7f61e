//! The update list protocol of pre-receive hooks.
//!
//! - `commands`: parsing `<old> <new> <ref>` lines into typed [`RefUpdate`]s.
//! - `refname`: classification of ref names into branches, tags and everything else.

pub mod commands;
pub mod refname;

pub use commands::{Operation, RefUpdate, UpdateList};
pub use refname::RefKind;

/// The number of hex characters used when showing object ids to users.
pub const SHORT_ID_LEN: usize = 8;
