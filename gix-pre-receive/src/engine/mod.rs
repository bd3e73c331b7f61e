//! Orchestration of the checks that decide whether a push is accepted.
//!
//! The [`HookEngine`] selects a [`Pipeline`] by the kind of repository that is
//! pushed to and runs it over the raw update list. Only git has real checks for
//! now; Subversion and Mercurial accept every push until their pipelines exist.

use std::path::Path;

use bstr::BString;

use crate::config::GateConfig;
use crate::protocol::RefUpdate;
use crate::repository::Repository;
use crate::Error;

mod git;
mod mercurial;
mod subversion;

pub use git::GitPipeline;
pub use mercurial::MercurialPipeline;
pub use subversion::SubversionPipeline;

/// The version control system of the repository being pushed to, as far as it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepositoryKind {
    Git,
    Subversion,
    Mercurial,
    /// A repository kind without a pipeline, identified by the given name.
    Unsupported(String),
}

impl RepositoryKind {
    /// Parse a kind from its name, like `git`, `svn` or `hg`.
    ///
    /// Names are matched case-insensitively; unknown names yield [`RepositoryKind::Unsupported`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "git" => RepositoryKind::Git,
            "svn" | "subversion" => RepositoryKind::Subversion,
            "hg" | "mercurial" => RepositoryKind::Mercurial,
            _ => RepositoryKind::Unsupported(name.to_owned()),
        }
    }

    /// Guess the kind of the repository at `path` from its directory layout.
    pub fn detect(path: &Path) -> Self {
        let is_bare_git = path.join("HEAD").is_file() && path.join("objects").is_dir() && path.join("refs").is_dir();
        if is_bare_git || path.join(".git").exists() {
            RepositoryKind::Git
        } else if path.join("format").is_file() && path.join("db").is_dir() {
            RepositoryKind::Subversion
        } else if path.join(".hg").is_dir() || (path.join("requires").is_file() && path.join("store").is_dir()) {
            RepositoryKind::Mercurial
        } else {
            RepositoryKind::Unsupported(path.display().to_string())
        }
    }

    /// The backend handling this kind, or an error if there is none.
    pub fn backend(&self) -> Result<Backend, Error> {
        match self {
            RepositoryKind::Git => Ok(Backend::Git),
            RepositoryKind::Subversion => Ok(Backend::Subversion),
            RepositoryKind::Mercurial => Ok(Backend::Mercurial),
            RepositoryKind::Unsupported(name) => Err(Error::UnsupportedBackend(name.clone())),
        }
    }
}

/// A repository kind with a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Backend {
    Git,
    Subversion,
    Mercurial,
}

impl Backend {
    /// The pipeline responsible for this backend.
    pub fn pipeline(self) -> &'static dyn Pipeline {
        match self {
            Backend::Git => &GitPipeline,
            Backend::Subversion => &SubversionPipeline,
            Backend::Mercurial => &MercurialPipeline,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Git => "git",
            Backend::Subversion => "svn",
            Backend::Mercurial => "hg",
        }
    }
}

/// The identity of whoever is pushing, used for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    /// The name of the pushing user, if known.
    pub name: Option<String>,
    /// The address the push came from, if known.
    pub remote_address: Option<String>,
}

/// Everything a single hook run needs, fixed for its whole duration.
pub struct Invocation<'a> {
    /// Who is pushing.
    pub viewer: Viewer,
    /// The kind of repository pushed to.
    pub kind: RepositoryKind,
    /// The history of the repository pushed to.
    pub repository: &'a dyn Repository,
    /// The raw update list, one `<old> <new> <ref>` line per update.
    pub input: BString,
    /// The settings of the repository.
    pub config: GateConfig,
}

/// The checks run for one backend.
pub trait Pipeline: Sync {
    /// Check the push described by `invocation` and return the updates it would apply.
    ///
    /// Any error rejects the whole push.
    fn run(&self, invocation: &Invocation<'_>) -> Result<Vec<RefUpdate>, Error>;
}

/// The result of an accepted push.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Outcome {
    /// The backend whose pipeline accepted the push.
    pub backend: Backend,
    /// The checked updates, with merge-bases and new commits where applicable.
    ///
    /// Empty for backends that don't inspect updates yet.
    pub updates: Vec<RefUpdate>,
}

/// Decides whether a push is accepted.
///
/// It never writes to the repository; its only effect is the verdict.
pub struct HookEngine<'a> {
    invocation: Invocation<'a>,
}

impl<'a> HookEngine<'a> {
    pub fn new(invocation: Invocation<'a>) -> Self {
        HookEngine { invocation }
    }

    /// Run the pipeline for the repository kind and return the accepted outcome, or why the push was refused.
    pub fn run(&self) -> Result<Outcome, Error> {
        let inv = &self.invocation;
        let _span = tracing::info_span!(
            "pre_receive",
            kind = ?inv.kind,
            viewer = inv.viewer.name.as_deref().unwrap_or("<unknown>"),
            remote = inv.viewer.remote_address.as_deref().unwrap_or("<unknown>"),
        )
        .entered();

        let result = inv.kind.backend().and_then(|backend| {
            let updates = backend.pipeline().run(inv)?;
            Ok(Outcome { backend, updates })
        });

        match &result {
            Ok(outcome) => tracing::info!(
                backend = outcome.backend.as_str(),
                updates = outcome.updates.len(),
                "push accepted"
            ),
            Err(Error::DangerousChange(rejection)) => {
                tracing::info!(branch = %rejection.branch(), "push rejected by policy");
            }
            Err(err) => tracing::error!(kind = ?err.kind(), error = %err, "push rejected"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_name() {
        assert_eq!(RepositoryKind::from_name("git"), RepositoryKind::Git);
        assert_eq!(RepositoryKind::from_name("Git"), RepositoryKind::Git);
        assert_eq!(RepositoryKind::from_name("svn"), RepositoryKind::Subversion);
        assert_eq!(RepositoryKind::from_name("subversion"), RepositoryKind::Subversion);
        assert_eq!(RepositoryKind::from_name("hg"), RepositoryKind::Mercurial);
        assert_eq!(RepositoryKind::from_name("mercurial"), RepositoryKind::Mercurial);
        assert_eq!(
            RepositoryKind::from_name("fossil"),
            RepositoryKind::Unsupported("fossil".into())
        );
    }

    #[test]
    fn unsupported_kinds_have_no_backend() {
        let err = RepositoryKind::Unsupported("fossil".into()).backend().unwrap_err();
        assert!(matches!(err, Error::UnsupportedBackend(ref name) if name == "fossil"));
        assert_eq!(RepositoryKind::Git.backend().unwrap(), Backend::Git);
    }

    #[test]
    fn detect_by_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let bare = root.join("bare.git");
        std::fs::create_dir_all(bare.join("objects")).unwrap();
        std::fs::create_dir_all(bare.join("refs")).unwrap();
        std::fs::write(bare.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        assert_eq!(RepositoryKind::detect(&bare), RepositoryKind::Git);

        let worktree = root.join("worktree");
        std::fs::create_dir_all(worktree.join(".git")).unwrap();
        assert_eq!(RepositoryKind::detect(&worktree), RepositoryKind::Git);

        let svn = root.join("svn");
        std::fs::create_dir_all(svn.join("db")).unwrap();
        std::fs::write(svn.join("format"), "5\n").unwrap();
        assert_eq!(RepositoryKind::detect(&svn), RepositoryKind::Subversion);

        let hg = root.join("hg");
        std::fs::create_dir_all(hg.join(".hg")).unwrap();
        assert_eq!(RepositoryKind::detect(&hg), RepositoryKind::Mercurial);

        let empty = root.join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        assert!(matches!(RepositoryKind::detect(&empty), RepositoryKind::Unsupported(_)));
    }
}
