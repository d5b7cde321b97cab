use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

/// Problems with the command line, detected before the directory is touched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing operand")]
    MissingOperand,

    #[error("extra operand '{0}'")]
    ExtraOperand(String),

    #[error("--list and --test can not be used together")]
    ListWithTest,

    #[error("failed to compile regular expression: {}", last_line(.0))]
    InvalidRegex(#[from] regex::Error),

    #[error("invalid umask '{value}': {source}")]
    UmaskSyntax {
        value: String,
        source: ParseIntError,
    },

    #[error("bad umask value")]
    UmaskRange,
}

/// `regex` reports syntax errors over several lines, pointing at the offending
/// spot. The diagnostic keeps only the final `error: ...` line.
fn last_line(err: &regex::Error) -> String {
    let text = err.to_string();
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

/// How a single script failed. Only fatal under `--exit-on-error`.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("{} exited with return code {code}", path.display())]
    NonZeroExit { path: PathBuf, code: i32 },

    #[error("{} was terminated by signal {signal}", path.display())]
    Signaled { path: PathBuf, signal: i32 },

    #[error("failed to exec {}: {source}", path.display())]
    Exec { path: PathBuf, source: io::Error },
}

/// Failure of [`ProcessExecutor::run`](crate::ProcessExecutor::run).
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Spawning or waiting for the child failed; blamed on the script.
    #[error("{0}")]
    Launch(io::Error),

    /// Plumbing between the runner and the child broke.
    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        source: io::Error,
    },
}

/// The error that ends a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to open directory {}: {source}", path.display())]
    OpenDirectory { path: PathBuf, source: io::Error },

    #[error("failed to stat component {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("component {} is a broken symbolic link", path.display())]
    BrokenSymlink { path: PathBuf },

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("{0}")]
    Snapshot(String),

    #[error("{context} for {}: {source}", path.display())]
    Internal {
        path: PathBuf,
        context: &'static str,
        source: io::Error,
    },
}
