//! Configuration of the pre-receive gate, read from the repository's git configuration.
//!
//! # Configuration Keys
//!
//! - `preReceive.allowDangerousChanges`: Let branch deletions and non-fast-forward updates through
//! - `preReceive.queryTimeout`: Timeout in milliseconds for a single history query
//! - `preReceive.git`: The `git` program used for history queries

use crate::Error;
use gix_config::File;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// Settings of a single repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Whether branch deletions and non-fast-forward branch updates are allowed.
    pub allow_dangerous_changes: bool,
    /// The time a single history query may take before it is killed.
    pub query_timeout: Duration,
    /// The program to run for history queries.
    pub git_program: OsString,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            allow_dangerous_changes: false,
            query_timeout: Duration::from_secs(60),
            git_program: "git".into(),
        }
    }
}

impl GateConfig {
    /// Load the configuration from `config`, using defaults for keys that aren't set.
    pub fn from_config(config: &File<'_>) -> Result<Self, Error> {
        let mut out = Self::default();

        if let Some(result) = config.boolean("preReceive.allowDangerousChanges") {
            out.allow_dangerous_changes = result.map_err(|e| {
                Error::Config(format!(
                    "invalid boolean value for 'preReceive.allowDangerousChanges': {e}"
                ))
            })?;
        }

        if let Some(result) = config.integer("preReceive.queryTimeout") {
            let value = result
                .map_err(|e| Error::Config(format!("invalid integer value for 'preReceive.queryTimeout': {e}")))?;
            out.query_timeout = parse_timeout(value, "preReceive.queryTimeout")?;
        }

        if let Some(value) = config.string("preReceive.git") {
            let program = std::str::from_utf8(&value)
                .map_err(|e| Error::Config(format!("invalid UTF-8 in 'preReceive.git': {e}")))?;
            if program.is_empty() {
                return Err(Error::Config("'preReceive.git' must not be empty".into()));
            }
            out.git_program = program.into();
        }

        Ok(out)
    }

    /// Load the `config` file of the repository at `git_dir`.
    ///
    /// A repository without a config file uses the defaults.
    pub fn from_git_dir(git_dir: &Path) -> Result<Self, Error> {
        let path = git_dir.join("config");
        if !path.is_file() {
            return Ok(Self::default());
        }
        let file = File::from_path_no_includes(path.clone(), gix_config::Source::Local)
            .map_err(|e| Error::Config(format!("could not read '{}': {e}", path.display())))?;
        Self::from_config(&file)
    }
}

/// Convert a millisecond count into a positive timeout.
fn parse_timeout(value: i64, key: &str) -> Result<Duration, Error> {
    match u64::try_from(value) {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(Error::Config(format!("'{key}' must be a positive number of milliseconds, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &'static str) -> File<'static> {
        File::try_from(text).unwrap()
    }

    #[test]
    fn defaults_apply_to_empty_config() {
        let cfg = GateConfig::from_config(&File::new(gix_config::file::Metadata::api())).unwrap();
        assert_eq!(cfg, GateConfig::default());
        assert!(!cfg.allow_dangerous_changes);
        assert_eq!(cfg.query_timeout, Duration::from_secs(60));
        assert_eq!(cfg.git_program, "git");
    }

    #[test]
    fn parse_all_keys() {
        let cfg = GateConfig::from_config(&config(
            "[preReceive]\n    allowDangerousChanges = yes\n    queryTimeout = 1500\n    git = /usr/local/bin/git\n",
        ))
        .unwrap();
        assert!(cfg.allow_dangerous_changes);
        assert_eq!(cfg.query_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.git_program, "/usr/local/bin/git");
    }

    #[test]
    fn section_and_key_names_are_case_insensitive() {
        let cfg = GateConfig::from_config(&config("[prereceive]\n    allowdangerouschanges = true\n")).unwrap();
        assert!(cfg.allow_dangerous_changes);
    }

    #[test]
    fn invalid_boolean_value() {
        let err = GateConfig::from_config(&config("[preReceive]\n    allowDangerousChanges = maybe\n")).unwrap_err();
        assert!(err.to_string().contains("invalid boolean value"), "{err}");
    }

    #[test]
    fn timeout_must_be_positive() {
        for text in ["[preReceive]\n    queryTimeout = 0\n", "[preReceive]\n    queryTimeout = -5\n"] {
            let err = GateConfig::from_config(&config(text)).unwrap_err();
            assert!(err.to_string().contains("positive number of milliseconds"), "{err}");
        }
    }

    #[test]
    fn load_from_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(GateConfig::from_git_dir(dir.path()).unwrap(), GateConfig::default());

        std::fs::write(
            dir.path().join("config"),
            "[core]\n\tbare = true\n[preReceive]\n\tallowDangerousChanges = true\n",
        )
        .unwrap();
        assert!(GateConfig::from_git_dir(dir.path()).unwrap().allow_dangerous_changes);
    }
}
