//! Concurrent enrichment of a batch of updates with history metadata.
//!
//! Both phases issue one query per eligible update through a shared
//! [`Repository`](crate::repository::Repository), with at most
//! [`MAX_IN_FLIGHT`](crate::parallel::MAX_IN_FLIGHT) queries running at once.
//! Results are written back only after every query of the phase succeeded.

mod merge_base;
mod new_commits;

pub use merge_base::resolve_merge_bases;
pub use new_commits::discover_new_commits;
