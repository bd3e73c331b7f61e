//! Policies deciding whether a push may proceed before any content is looked at.

pub mod dangerous;

pub use dangerous::{DangerousChangePolicy, Rejection};
