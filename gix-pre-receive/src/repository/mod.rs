//! History queries against the repository receiving the push.
//!
//! The pipeline never inspects objects itself. It asks a [`Repository`] two
//! questions, each answered by one external process in the default
//! [`GitCli`] implementation:
//!
//! - the merge-base of two commits, to tell fast-forwards from rewrites,
//! - the commits a new tip introduces that no existing ref already reaches.
//!
//! Implementations are shared read-only between worker threads, hence the `Sync` bound.

use gix_hash::ObjectId;
use std::time::Duration;

mod git;

pub use git::GitCli;

/// The errors produced by history queries.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("could not spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to communicate with '{command}'")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("'{command}' did not finish within {}ms and was killed", timeout.as_millis())]
    Timeout { command: String, timeout: Duration },
    #[error("'{command}' produced output that is not an object id: {output:?}")]
    InvalidOutput { command: String, output: String },
}

/// A read-only handle to the history of the repository a push targets.
pub trait Repository: Sync {
    /// Return the best common ancestor of `a` and `b`.
    ///
    /// Failing to find one, as with unrelated histories, is an error.
    fn merge_base(&self, a: &ObjectId, b: &ObjectId) -> Result<ObjectId, Error>;

    /// Return all commits reachable from `tip` that are not reachable from any existing ref.
    ///
    /// The order is the one of the underlying history walk, most recent first.
    fn new_commits(&self, tip: &ObjectId) -> Result<Vec<ObjectId>, Error>;
}
