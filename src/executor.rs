use crate::command::{Candidate, Stdin};
use crate::error::ExecError;
use crate::io_adapters::Console;
use std::ffi::OsString;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// How a finished script ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Success,
    Exited(i32),
    Signaled(i32),
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Termination::Success,
            Some(code) => Termination::Exited(code),
            None => terminated_by_signal(status),
        }
    }
}

fn terminated_by_signal(status: ExitStatus) -> Termination {
    match status.signal() {
        Some(signal) => Termination::Signaled(signal),
        None => Termination::Exited(-1),
    }
}

/// Runs one script at a time, buffering its output until it closes both
/// streams and relaying the result afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    report: bool,
}

impl ProcessExecutor {
    /// With `report` set, non-empty output is preceded by a `PATH:` line.
    pub fn new(report: bool) -> Self {
        Self { report }
    }

    /// Run `script` with `args`, feeding it `stdin`.
    ///
    /// Standard error and standard output are both read to the end before the
    /// child is waited for, then relayed to `console` in that order. A
    /// non-zero exit is a regular [`Termination`], not an error.
    pub fn run(
        &self,
        script: &Candidate,
        stdin: Box<dyn Stdin>,
        args: &[OsString],
        console: &mut Console,
    ) -> Result<Termination, ExecError> {
        let mut child = Command::new(script.path())
            .args(args)
            .stdin(stdin.stdio())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExecError::Launch)?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        // A child blocked on a full stderr pipe would never close stdout, so
        // the two streams are drained side by side.
        let (err_bytes, out_bytes) = thread::scope(|s| {
            let err_reader = s.spawn(move || read_all(stderr));
            let out_bytes = read_all(stdout);
            let err_bytes = err_reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
            (err_bytes, out_bytes)
        });
        let err_bytes = err_bytes.map_err(|source| ExecError::Internal {
            context: "reading script stderr",
            source,
        })?;
        let out_bytes = out_bytes.map_err(|source| ExecError::Internal {
            context: "reading script stdout",
            source,
        })?;

        let status = child.wait().map_err(ExecError::Launch)?;

        self.relay(script, &err_bytes, &out_bytes, console)
            .map_err(|source| ExecError::Internal {
                context: "relaying script output",
                source,
            })?;

        Ok(status.into())
    }

    fn relay(
        &self,
        script: &Candidate,
        err_bytes: &[u8],
        out_bytes: &[u8],
        console: &mut Console,
    ) -> io::Result<()> {
        if self.report && !(err_bytes.is_empty() && out_bytes.is_empty()) {
            writeln!(console.out(), "{script}:")?;
            console.out().flush()?;
        }
        console.err().write_all(err_bytes)?;
        console.err().flush()?;
        console.out().write_all(out_bytes)?;
        console.out().flush()
    }
}

fn read_all(mut pipe: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)?;
    Ok(buf)
}

fn missing_pipe(stream: &'static str) -> ExecError {
    ExecError::Internal {
        context: "creating script pipes",
        source: io::Error::other(format!("no {stream} handle for child")),
    }
}
