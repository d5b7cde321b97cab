//! Run every valid drop-in script of a directory, one after another.
//!
//! This crate provides the selection-and-execution engine behind the
//! `runparts` binary: file names are filtered by a [`NameValidator`], the
//! directory is listed in a stable order, every eligible entry is classified
//! from its metadata and then either printed (test and list modes) or run as a
//! child process whose output is captured and relayed.
//!
//! The main entry point is [`PartRunner`], configured by an immutable
//! [`ExecutionPolicy`]. The binary builds that policy from the command line
//! through [`Config`].

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
mod executor;
pub mod io_adapters;
mod lister;
pub mod logging;
pub mod policy;
mod runner;
mod stdin_snapshot;
#[cfg(test)]
mod testutil;
mod validator;

pub use config::{Config, Umask};
pub use error::{ConfigError, RunError, ScriptError};
pub use executor::{ProcessExecutor, Termination};
pub use lister::list_directory;
pub use policy::{ExecutionPolicy, Mode, Order};
pub use runner::PartRunner;
pub use stdin_snapshot::StdinSnapshot;
pub use validator::{NamePolicy, NameValidator};
