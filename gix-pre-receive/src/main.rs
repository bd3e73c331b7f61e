use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gix_pre_receive::{GateConfig, GitCli, HookEngine, Invocation, RepositoryKind, Viewer, INTERNAL_ERROR_MESSAGE};
use tracing_subscriber::EnvFilter;

/// The environment variable holding the log filter, like `gix_pre_receive=debug`.
const LOG_ENV: &str = "GIX_PRE_RECEIVE_LOG";

/// Check the ref updates of a push, read from stdin, and reject dangerous changes.
///
/// Install as `hooks/pre-receive` of a repository, or call it from one.
#[derive(Debug, Parser)]
#[command(name = "gix-pre-receive", version)]
struct Args {
    /// The repository receiving the push.
    #[arg(long, env = "GIT_DIR", default_value = ".")]
    git_dir: PathBuf,

    /// The kind of repository: git, svn or hg. Detected from the repository layout if unset.
    #[arg(long)]
    kind: Option<String>,

    /// Let branch deletions and non-fast-forward updates through.
    #[arg(long)]
    allow_dangerous_changes: bool,

    /// Kill history queries running longer than this many milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    query_timeout_ms: Option<u64>,

    /// The name of the pushing user, for logging.
    #[arg(long, env = "GIX_PRE_RECEIVE_VIEWER")]
    viewer: Option<String>,

    /// The address the push came from, for logging.
    #[arg(long, env = "GIX_PRE_RECEIVE_REMOTE_ADDRESS")]
    remote_address: Option<String>,
}

/// Everything read before the checks can run.
struct Setup {
    kind: RepositoryKind,
    config: GateConfig,
    input: Vec<u8>,
}

// Everything written to stderr reaches the pushing client, so failures print
// nothing but the user message. Details only go to the log.
fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let Setup { kind, config, input } = match setup(&args) {
        Ok(setup) => setup,
        Err(err) => {
            tracing::error!(error = format!("{err:#}"), "could not prepare the push check");
            eprintln!("{INTERNAL_ERROR_MESSAGE}");
            return ExitCode::FAILURE;
        }
    };

    let repo = GitCli::new(&args.git_dir)
        .with_program(config.git_program.clone())
        .with_timeout(config.query_timeout);
    let engine = HookEngine::new(Invocation {
        viewer: Viewer {
            name: args.viewer,
            remote_address: args.remote_address,
        },
        kind,
        repository: &repo,
        input: input.into(),
        config,
    });

    match engine.run() {
        Ok(_outcome) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Read the update list, determine the repository kind, and load its configuration with command-line overrides.
fn setup(args: &Args) -> anyhow::Result<Setup> {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .context("failed to read ref updates from stdin")?;

    let kind = match &args.kind {
        Some(name) => RepositoryKind::from_name(name),
        None => RepositoryKind::detect(&args.git_dir),
    };

    let mut config = if kind == RepositoryKind::Git {
        GateConfig::from_git_dir(&args.git_dir)
            .with_context(|| format!("failed to load configuration of '{}'", args.git_dir.display()))?
    } else {
        GateConfig::default()
    };
    if args.allow_dangerous_changes {
        config.allow_dangerous_changes = true;
    }
    if let Some(ms) = args.query_timeout_ms {
        config.query_timeout = Duration::from_millis(ms);
    }

    Ok(Setup { kind, config, input })
}

/// Log to stderr, which git relays to the pushing client, so nothing is logged unless asked for.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
