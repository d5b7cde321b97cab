use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// A directory entry considered for execution: its bare file name and the
/// path formed by joining it onto the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    name: OsString,
    path: PathBuf,
}

impl Candidate {
    pub fn new(directory: &Path, name: OsString) -> Self {
        let path = directory.join(&name);
        Self { name, path }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Input for a script, convertible into a [`Stdio`] handle for spawning it.
///
/// A blanket implementation exists for any type that implements
/// `Into<Stdio>`, which covers the `File` handles produced by a
/// [`StdinSnapshot`](crate::StdinSnapshot).
pub trait Stdin {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The runner's own standard input, handed to children unchanged.
pub struct InheritedStdin;

impl From<InheritedStdin> for Stdio {
    fn from(_: InheritedStdin) -> Self {
        Stdio::inherit()
    }
}
