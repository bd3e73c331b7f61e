/*!
A pre-receive gate for hosted repositories.

Given the ref updates a push would apply, it decides whether the push is
accepted before any of its content is looked at:

- parse the update list and classify each update as create, update or delete
  of a branch, a tag or another ref,
- resolve merge-bases of updated refs to tell fast-forwards from rewrites,
- reject branch deletions and non-fast-forward branch updates unless the
  repository allows dangerous changes,
- discover the commits each accepted update introduces.

History queries run as external `git` processes, at most
[`parallel::MAX_IN_FLIGHT`] at a time. The gate never writes to the repository.

```no_run
use gix_pre_receive::{GateConfig, GitCli, HookEngine, Invocation, RepositoryKind, Viewer};
use std::io::Read;

let mut input = Vec::new();
std::io::stdin().read_to_end(&mut input)?;
let config = GateConfig::default();
let repo = GitCli::new("/srv/repos/project.git").with_timeout(config.query_timeout);
let engine = HookEngine::new(Invocation {
    viewer: Viewer::default(),
    kind: RepositoryKind::Git,
    repository: &repo,
    input: input.into(),
    config,
});
match engine.run() {
    Ok(outcome) => println!("accepted {} updates", outcome.updates.len()),
    Err(err) => eprintln!("{}", err.user_message()),
}
# Ok::<_, std::io::Error>(())
```
*/

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod history;
pub mod parallel;
pub mod policy;
pub mod protocol;
pub mod repository;

pub use config::GateConfig;
pub use engine::{Backend, HookEngine, Invocation, Outcome, Pipeline, RepositoryKind, Viewer};
pub use policy::{DangerousChangePolicy, Rejection};
pub use protocol::{Operation, RefKind, RefUpdate, UpdateList};
pub use repository::{GitCli, Repository};

/// The message shown to clients whose push failed for reasons they can't fix.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "The push could not be validated due to an internal error on the server and was not accepted. Please try again later.";

/// Stable high-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The update list was malformed.
    Protocol,
    /// The repository kind has no pipeline.
    Unsupported,
    /// A history query failed.
    Subprocess,
    /// The push was refused by policy.
    Rejected,
    /// The repository configuration is invalid or unreadable.
    Config,
}

/// The error type of the gate. Every error rejects the whole push.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A line of the update list could not be parsed.
    #[error("malformed ref update '{line}': {reason}")]
    Parse { line: String, reason: String },
    /// The repository is of a kind without a pipeline.
    #[error("unsupported repository kind: {0}")]
    UnsupportedBackend(String),
    /// A history query failed or produced unusable output.
    #[error("history query failed: {0}")]
    Subprocess(#[from] repository::Error),
    /// The push contains a dangerous change and was refused.
    #[error(transparent)]
    DangerousChange(#[from] policy::Rejection),
    /// The configuration could not be read or holds an invalid value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn parse(line: &[u8], reason: impl Into<String>) -> Self {
        Error::Parse {
            line: bstr::ByteSlice::to_str_lossy(line).into_owned(),
            reason: reason.into(),
        }
    }

    /// Fast classification helper returning a stable error kind.
    pub fn kind(&self) -> Kind {
        match self {
            Error::Parse { .. } => Kind::Protocol,
            Error::UnsupportedBackend(_) => Kind::Unsupported,
            Error::Subprocess(_) => Kind::Subprocess,
            Error::DangerousChange(_) => Kind::Rejected,
            Error::Config(_) => Kind::Config,
        }
    }

    /// Return `true` if the push was refused on purpose rather than due to a failure.
    pub fn is_rejection(&self) -> bool {
        self.kind() == Kind::Rejected
    }

    /// The message to show to the pushing client.
    ///
    /// Internal failures are reported with a generic message, their details belong into logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Parse { .. } | Error::UnsupportedBackend(_) | Error::DangerousChange(_) => self.to_string(),
            Error::Subprocess(_) | Error::Config(_) => INTERNAL_ERROR_MESSAGE.to_owned(),
        }
    }
}
