use crate::validator::NameValidator;
use std::ffi::OsString;

/// What happens to a selected script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run it.
    #[default]
    Execute,
    /// Print the path of every script that would run.
    Test,
    /// Print the path of every valid, readable file.
    List,
}

/// Direction in which directory entries are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// Everything a [`PartRunner`](crate::PartRunner) needs to know about one run.
///
/// Built once before the first candidate is looked at and never changed
/// afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    pub validator: NameValidator,
    pub mode: Mode,
    pub order: Order,
    pub exit_on_error: bool,
    /// Log every invocation before it starts.
    pub verbose: bool,
    /// Print a header naming the script before relaying non-empty output.
    pub report: bool,
    /// Give every script its own replay of one captured copy of stdin.
    pub share_stdin: bool,
    /// Extra arguments passed to every script.
    pub args: Vec<OsString>,
}

impl ExecutionPolicy {
    pub fn new(validator: NameValidator) -> Self {
        Self {
            validator,
            mode: Mode::default(),
            order: Order::default(),
            exit_on_error: false,
            verbose: false,
            report: false,
            share_stdin: false,
            args: Vec::new(),
        }
    }
}
