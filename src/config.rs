use crate::cli::Args;
use crate::error::ConfigError;
use crate::policy::{ExecutionPolicy, Mode, Order};
use crate::validator::{NamePolicy, NameValidator};
use nix::sys::stat::{self, mode_t};
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

const MAX_UMASK: u32 = 0o7777;

/// A file mode creation mask, parsed from its octal spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Umask(u32);

impl Umask {
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Install this mask for the whole process.
    pub fn apply(self) {
        stat::umask(stat::Mode::from_bits_truncate(self.0 as mode_t));
    }
}

impl FromStr for Umask {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = u32::from_str_radix(s, 8).map_err(|source| ConfigError::UmaskSyntax {
            value: s.to_string(),
            source,
        })?;
        if bits > MAX_UMASK {
            return Err(ConfigError::UmaskRange);
        }
        Ok(Umask(bits))
    }
}

/// A validated command line.
#[derive(Debug)]
pub struct Config {
    pub directory: PathBuf,
    pub umask: Umask,
    pub policy: ExecutionPolicy,
}

impl Config {
    /// Check the parsed flags and turn them into a run configuration.
    ///
    /// Nothing here touches the filesystem.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let mut operands = args.directory.into_iter();
        let directory = operands.next().ok_or(ConfigError::MissingOperand)?;
        if let Some(extra) = operands.next() {
            return Err(ConfigError::ExtraOperand(extra));
        }

        if args.list && args.test {
            return Err(ConfigError::ListWithTest);
        }

        let names = match args.regex {
            Some(pattern) if !pattern.is_empty() => NamePolicy::Custom(pattern),
            _ if args.lsbsysinit => NamePolicy::LsbSysinit,
            _ => NamePolicy::Default,
        };
        let validator = NameValidator::new(&names)?;
        let umask = args.umask.parse()?;

        let mode = if args.list {
            Mode::List
        } else if args.test {
            Mode::Test
        } else {
            Mode::Execute
        };
        let order = if args.reverse {
            Order::Descending
        } else {
            Order::Ascending
        };

        let policy = ExecutionPolicy {
            validator,
            mode,
            order,
            exit_on_error: args.exit_on_error,
            verbose: args.verbose,
            report: args.report,
            share_stdin: args.stdin,
            args: args.arg.into_iter().map(OsString::from).collect(),
        };

        Ok(Config {
            directory: PathBuf::from(directory),
            umask,
            policy,
        })
    }
}
