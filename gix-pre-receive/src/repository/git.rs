//! A [`Repository`] answering history queries by running `git`.

use super::{Error, Repository};
use gix_hash::ObjectId;
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// How often a running query is checked for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Queries the history of a git repository by spawning `git` processes.
///
/// Each query is one process. The process inherits the environment of the
/// hook, which lets it see objects that are still in the quarantine directory
/// of the receiving git process.
#[derive(Debug, Clone)]
pub struct GitCli {
    git_dir: PathBuf,
    program: OsString,
    timeout: Duration,
}

impl GitCli {
    /// The time a single query may take unless configured otherwise.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a handle for the repository at `git_dir`, using `git` from `PATH`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        GitCli {
            git_dir: git_dir.into(),
            program: "git".into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Use `program` instead of `git`.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill queries that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `git <args>` and return its standard output if it exits successfully.
    fn run(&self, args: &[&str]) -> Result<Vec<u8>, Error> {
        let command = format!("git {}", args.join(" "));
        let program = self.program.to_string_lossy().into_owned();
        tracing::debug!(%command, git_dir = %self.git_dir.display(), "running history query");

        let start = Instant::now();
        let child = gix_command::prepare(self.program.clone())
            .arg("--git-dir")
            .arg(self.git_dir.as_os_str())
            .args(args.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn { program, source })?;

        let (status, stdout, stderr) = self.wait_with_timeout(child, &command)?;
        tracing::debug!(%command, elapsed_ms = start.elapsed().as_millis() as u64, %status, "history query finished");

        if !status.success() {
            return Err(Error::Failed {
                command,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_owned(),
            });
        }
        Ok(stdout)
    }

    /// Drain both output streams while waiting for `child`, killing it once the timeout passed.
    fn wait_with_timeout(&self, mut child: Child, command: &str) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), Error> {
        let io_err = |source| Error::Io {
            command: command.to_owned(),
            source,
        };
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                break status;
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                // Descendants of the killed process may still hold the pipes open, so the
                // readers are detached instead of joined. They end once the pipes close.
                drop((stdout, stderr));
                tracing::debug!(command, timeout_ms = self.timeout.as_millis() as u64, "history query timed out");
                return Err(Error::Timeout {
                    command: command.to_owned(),
                    timeout: self.timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = join(stdout).map_err(io_err)?;
        let stderr = join(stderr).map_err(io_err)?;
        Ok((status, stdout, stderr))
    }
}

type Reader = std::thread::JoinHandle<std::io::Result<Vec<u8>>>;

fn drain(mut stream: impl Read + Send + 'static) -> Reader {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join(reader: Option<Reader>) -> std::io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("output reader panicked"))),
        None => Ok(Vec::new()),
    }
}

/// Parse a single object id, ignoring trailing line terminators.
fn parse_single_id(output: &[u8], command: &str) -> Result<ObjectId, Error> {
    let text = String::from_utf8_lossy(output);
    let hex = text.trim_end_matches(['\n', '\r']);
    ObjectId::from_hex(hex.as_bytes()).map_err(|_| Error::InvalidOutput {
        command: command.to_owned(),
        output: text.into_owned(),
    })
}

/// Parse one object id per line, keeping the order of the output.
fn parse_id_lines(output: &[u8], command: &str) -> Result<Vec<ObjectId>, Error> {
    let text = String::from_utf8_lossy(output);
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(|line| {
            ObjectId::from_hex(line.as_bytes()).map_err(|_| Error::InvalidOutput {
                command: command.to_owned(),
                output: line.to_owned(),
            })
        })
        .collect()
}

impl Repository for GitCli {
    fn merge_base(&self, a: &ObjectId, b: &ObjectId) -> Result<ObjectId, Error> {
        let (a, b) = (a.to_string(), b.to_string());
        let args = ["merge-base", a.as_str(), b.as_str()];
        let out = self.run(&args)?;
        parse_single_id(&out, &format!("git {}", args.join(" ")))
    }

    fn new_commits(&self, tip: &ObjectId) -> Result<Vec<ObjectId>, Error> {
        let tip = tip.to_string();
        let args = ["log", "--format=%H", tip.as_str(), "--not", "--all"];
        let out = self.run(&args)?;
        parse_id_lines(&out, &format!("git {}", args.join(" ")))
    }
}
