use crate::command::{Candidate, InheritedStdin, Stdin};
use crate::error::{ExecError, RunError, ScriptError};
use crate::executor::{ProcessExecutor, Termination};
use crate::io_adapters::Console;
use crate::lister::list_directory;
use crate::policy::{ExecutionPolicy, Mode};
use crate::stdin_snapshot::StdinSnapshot;
use nix::unistd::{AccessFlags, access};
use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// What a candidate turned out to be when it was looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileClass {
    Directory,
    /// The entry is a symbolic link whose target cannot be reached.
    BrokenSymlink,
    /// Devices, sockets, fifos.
    NotRegular,
    Regular { executable: bool, readable: bool },
}

impl FileClass {
    fn of(path: &Path) -> io::Result<Self> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                return match fs::symlink_metadata(path) {
                    Ok(link) if link.file_type().is_symlink() => Ok(FileClass::BrokenSymlink),
                    _ => Err(err),
                };
            }
        };

        if metadata.is_dir() {
            Ok(FileClass::Directory)
        } else if !metadata.is_file() {
            Ok(FileClass::NotRegular)
        } else {
            Ok(FileClass::Regular {
                executable: access(path, AccessFlags::X_OK).is_ok(),
                readable: access(path, AccessFlags::R_OK).is_ok(),
            })
        }
    }
}

/// Runs, tests or lists the parts found in one directory.
///
/// Example
/// ```no_run
/// use runparts::{ExecutionPolicy, NamePolicy, NameValidator, PartRunner};
/// use runparts::io_adapters::Console;
/// use std::path::Path;
///
/// let policy = ExecutionPolicy::new(NameValidator::new(&NamePolicy::Default).unwrap());
/// let runner = PartRunner::new(policy);
/// runner
///     .run(Path::new("/etc/cron.daily"), &mut std::io::stdin(), &mut Console::stdio())
///     .unwrap();
/// ```
pub struct PartRunner {
    policy: ExecutionPolicy,
    executor: ProcessExecutor,
}

impl PartRunner {
    pub fn new(policy: ExecutionPolicy) -> Self {
        let executor = ProcessExecutor::new(policy.report);
        Self { policy, executor }
    }

    /// Visit every entry of `directory` in policy order.
    ///
    /// `stdin` is only read when stdin sharing is on and a script is about to
    /// be executed; otherwise scripts inherit the process's standard input.
    /// Returns the first fatal error; contained failures are logged.
    pub fn run(
        &self,
        directory: &Path,
        stdin: &mut dyn Read,
        console: &mut Console,
    ) -> Result<(), RunError> {
        let names = list_directory(directory, self.policy.order).map_err(|source| {
            RunError::OpenDirectory {
                path: directory.to_path_buf(),
                source,
            }
        })?;

        // Dropped, and its file removed, on every way out of this function.
        let mut snapshot: Option<StdinSnapshot> = None;

        for name in names {
            if !self.policy.validator.accepts(&name) {
                continue;
            }
            let candidate = Candidate::new(directory, name);
            self.dispatch(&candidate, &mut snapshot, stdin, console)?;
        }
        Ok(())
    }

    fn dispatch(
        &self,
        candidate: &Candidate,
        snapshot: &mut Option<StdinSnapshot>,
        stdin: &mut dyn Read,
        console: &mut Console,
    ) -> Result<(), RunError> {
        let class = match FileClass::of(candidate.path()) {
            Ok(class) => class,
            Err(source) => {
                return self.contain(RunError::Stat {
                    path: candidate.path().to_path_buf(),
                    source,
                });
            }
        };

        let mode = self.policy.mode;
        match class {
            FileClass::Directory => Ok(()),
            FileClass::BrokenSymlink if mode == Mode::List => Ok(()),
            FileClass::BrokenSymlink => Err(RunError::BrokenSymlink {
                path: candidate.path().to_path_buf(),
            }),
            FileClass::NotRegular => {
                tracing::warn!("component {candidate} is not an executable plain file");
                Ok(())
            }
            FileClass::Regular {
                executable: true,
                readable,
            } => match mode {
                Mode::Test => print_path(candidate, console),
                Mode::List if readable => print_path(candidate, console),
                Mode::List => Ok(()),
                Mode::Execute => self.execute(candidate, snapshot, stdin, console),
            },
            FileClass::Regular {
                executable: false,
                readable,
            } => {
                if mode == Mode::List && readable {
                    print_path(candidate, console)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn execute(
        &self,
        candidate: &Candidate,
        snapshot: &mut Option<StdinSnapshot>,
        stdin: &mut dyn Read,
        console: &mut Console,
    ) -> Result<(), RunError> {
        if self.policy.verbose {
            self.log_invocation(candidate);
        }

        let input: Box<dyn Stdin> = if self.policy.share_stdin {
            let shared = match snapshot.take() {
                Some(shared) => shared,
                None => StdinSnapshot::capture(stdin)?,
            };
            let file = snapshot
                .insert(shared)
                .rewind()
                .map_err(|e| RunError::Snapshot(format!("couldn't rewind stdin copy: {e}")))?;
            Box::new(file)
        } else {
            Box::new(InheritedStdin)
        };

        let outcome = self
            .executor
            .run(candidate, input, &self.policy.args, console);
        match classify_exit(candidate, outcome)? {
            Some(failure) => self.contain(failure.into()),
            None => Ok(()),
        }
    }

    fn log_invocation(&self, candidate: &Candidate) {
        if self.policy.args.is_empty() {
            tracing::info!("executing {candidate}");
        } else {
            let args = self
                .policy
                .args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!("executing {candidate} {args}");
        }
    }

    /// Abort under `--exit-on-error`, otherwise log and carry on.
    fn contain(&self, err: RunError) -> Result<(), RunError> {
        if self.policy.exit_on_error {
            Err(err)
        } else {
            tracing::error!("{err}");
            Ok(())
        }
    }
}

/// Turn an executor result into the script's failure, if it failed.
///
/// Broken plumbing between runner and child is not the script's fault and is
/// returned as a fatal error straight away.
fn classify_exit(
    candidate: &Candidate,
    outcome: Result<Termination, ExecError>,
) -> Result<Option<ScriptError>, RunError> {
    let path = candidate.path().to_path_buf();
    let failure = match outcome {
        Ok(Termination::Success) => return Ok(None),
        Ok(Termination::Exited(code)) => ScriptError::NonZeroExit { path, code },
        Ok(Termination::Signaled(signal)) => ScriptError::Signaled { path, signal },
        Err(ExecError::Launch(source)) => ScriptError::Exec { path, source },
        Err(ExecError::Internal { context, source }) => {
            return Err(RunError::Internal {
                path,
                context,
                source,
            });
        }
    };
    Ok(Some(failure))
}

fn print_path(candidate: &Candidate, console: &mut Console) -> Result<(), RunError> {
    let print = |out: &mut dyn Write| -> io::Result<()> {
        out.write_all(candidate.path().as_os_str().as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    };
    print(console.out()).map_err(|source| RunError::Internal {
        path: candidate.path().to_path_buf(),
        context: "printing path",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Order;
    use crate::testutil::{MemWriter, write_file, write_script};
    use crate::validator::{NamePolicy, NameValidator};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::os::unix::fs::{PermissionsExt, symlink};
    use std::rc::Rc;

    fn policy() -> ExecutionPolicy {
        ExecutionPolicy::new(NameValidator::new(&NamePolicy::Default).unwrap())
    }

    fn run(
        policy: ExecutionPolicy,
        dir: &Path,
        stdin: &mut dyn Read,
    ) -> (Result<(), RunError>, String) {
        let (out_writer, out) = MemWriter::with_handle();
        let mut console = Console::new(out_writer, io::sink());
        let result = PartRunner::new(policy).run(dir, stdin, &mut console);
        (result, text(&out))
    }

    fn text(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    /// `01first` prints A, `02second` fails, `03third` leaves a marker,
    /// `BAD.name` would leave another marker if it ever ran.
    fn scenario(dir: &Path) {
        write_script(dir, "01first", "echo A\n");
        write_script(dir, "02second", "exit 1\n");
        write_script(dir, "03third", "touch \"$(dirname \"$0\")/third.ran\"\n");
        write_script(dir, "BAD.name", "touch \"$(dirname \"$0\")/bad.ran\"\n");
    }

    #[test]
    fn default_run_contains_script_failures() {
        let dir = tempfile::tempdir().unwrap();
        scenario(dir.path());

        let (result, out) = run(policy(), dir.path(), &mut io::empty());

        assert!(result.is_ok());
        assert_eq!(out, "A\n");
        assert!(dir.path().join("third.ran").exists());
        assert!(!dir.path().join("bad.ran").exists());
    }

    #[test]
    fn exit_on_error_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        scenario(dir.path());
        let mut policy = policy();
        policy.exit_on_error = true;

        let (result, out) = run(policy, dir.path(), &mut io::empty());

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            RunError::Script(ScriptError::NonZeroExit { code: 1, .. })
        ));
        assert!(err.to_string().ends_with("02second exited with return code 1"));
        assert_eq!(out, "A\n");
        assert!(!dir.path().join("third.ran").exists());
        assert!(!dir.path().join("bad.ran").exists());
    }

    #[test]
    fn reverse_order_runs_last_name_first() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "a", "echo a\n");
        write_script(dir.path(), "b", "echo b\n");
        write_script(dir.path(), "c", "echo c\n");

        let (_, forward) = run(policy(), dir.path(), &mut io::empty());
        let mut reversed = policy();
        reversed.order = Order::Descending;
        let (_, backward) = run(reversed, dir.path(), &mut io::empty());

        assert_eq!(forward, "a\nb\nc\n");
        assert_eq!(backward, "c\nb\na\n");
    }

    #[test]
    fn test_mode_prints_without_running() {
        let dir = tempfile::tempdir().unwrap();
        scenario(dir.path());
        write_file(dir.path(), "plain", "data\n", 0o644);
        fs::create_dir(dir.path().join("subdir")).unwrap();
        let mut policy = policy();
        policy.mode = Mode::Test;

        let (result, out) = run(policy, dir.path(), &mut io::empty());

        assert!(result.is_ok());
        let d = dir.path().display();
        assert_eq!(out, format!("{d}/01first\n{d}/02second\n{d}/03third\n"));
        assert!(!dir.path().join("third.ran").exists());
    }

    #[test]
    fn list_mode_includes_readable_non_executables() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "10-exec", "touch ran\n");
        write_file(dir.path(), "20-plain", "data\n", 0o644);
        write_file(dir.path(), "skip.me", "data\n", 0o644);
        fs::create_dir(dir.path().join("30-dir")).unwrap();
        let mut policy = policy();
        policy.mode = Mode::List;

        let (result, out) = run(policy, dir.path(), &mut io::empty());

        assert!(result.is_ok());
        let d = dir.path().display();
        assert_eq!(out, format!("{d}/10-exec\n{d}/20-plain\n"));
    }

    #[test]
    fn non_executable_files_are_skipped_when_executing() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "plain", "#!/bin/sh\necho never\n", 0o644);
        write_script(dir.path(), "real", "echo real\n");

        let (result, out) = run(policy(), dir.path(), &mut io::empty());

        assert!(result.is_ok());
        assert_eq!(out, "real\n");
    }

    #[test]
    fn broken_symlink_is_fatal_even_without_exit_on_error() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "zz-after", "echo after\n");
        symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();

        let (result, out) = run(policy(), dir.path(), &mut io::empty());

        let err = result.unwrap_err();
        assert!(matches!(err, RunError::BrokenSymlink { .. }));
        assert!(err.to_string().ends_with("dangling is a broken symbolic link"));
        assert_eq!(out, "");
    }

    #[test]
    fn broken_symlink_is_ignored_by_list_mode() {
        let dir = tempfile::tempdir().unwrap();
        symlink(dir.path().join("missing"), dir.path().join("dangling")).unwrap();
        let mut policy = policy();
        policy.mode = Mode::List;

        let (result, out) = run(policy, dir.path(), &mut io::empty());

        assert!(result.is_ok());
        assert_eq!(out, "");
    }

    #[test]
    fn symlink_to_a_script_runs_it() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let script = write_script(target.path(), "real", "echo via link\n");
        symlink(script.path(), dir.path().join("linked")).unwrap();

        let (result, out) = run(policy(), dir.path(), &mut io::empty());

        assert!(result.is_ok());
        assert_eq!(out, "via link\n");
    }

    #[test]
    fn fifo_is_not_an_executable_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        nix::unistd::mkfifo(
            dir.path().join("pipe").as_path(),
            nix::sys::stat::Mode::S_IRWXU,
        )
        .unwrap();
        write_script(dir.path(), "zz", "echo still runs\n");

        let (result, out) = run(policy(), dir.path(), &mut io::empty());

        assert!(result.is_ok());
        assert_eq!(out, "still runs\n");
    }

    #[test]
    fn shared_stdin_is_replayed_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "1-peek", "head -c 4\necho\n");
        write_script(dir.path(), "2-all", "cat\n");
        write_script(dir.path(), "3-all", "cat\n");
        let mut policy = policy();
        policy.share_stdin = true;
        let mut input = Cursor::new(b"0123456789\n".to_vec());

        let (result, out) = run(policy, dir.path(), &mut input);

        assert!(result.is_ok());
        assert_eq!(out, "0123\n0123456789\n0123456789\n");
    }

    #[test]
    fn stdin_is_not_touched_when_nothing_executes() {
        struct Untouchable;
        impl Read for Untouchable {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("stdin must not be read"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "part", "cat\n");
        let mut policy = policy();
        policy.share_stdin = true;
        policy.mode = Mode::Test;

        let (result, _) = run(policy, dir.path(), &mut Untouchable);
        assert!(result.is_ok());
    }

    #[test]
    fn arguments_reach_every_script() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "a", "echo \"a:$*\"\n");
        write_script(dir.path(), "b", "echo \"b:$*\"\n");
        let mut policy = policy();
        policy.args = vec!["start".into(), "--quiet".into()];

        let (_, out) = run(policy, dir.path(), &mut io::empty());
        assert_eq!(out, "a:start --quiet\nb:start --quiet\n");
    }

    #[test]
    fn custom_regex_selects_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "foo.sh", "echo foo.sh\n");
        write_script(dir.path(), "foobar", "echo foobar\n");
        write_script(dir.path(), "barfoo", "echo barfoo\n");
        let validator = NameValidator::new(&NamePolicy::Custom("^foo.*$".into())).unwrap();

        let (_, out) = run(ExecutionPolicy::new(validator), dir.path(), &mut io::empty());
        assert_eq!(out, "foo.sh\nfoobar\n");
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let (result, _) = run(policy(), &missing, &mut io::empty());

        let err = result.unwrap_err();
        assert!(matches!(err, RunError::OpenDirectory { .. }));
        assert!(err.to_string().starts_with("failed to open directory"));
    }

    #[test]
    fn classification_distinguishes_entry_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "x", "true\n");
        let plain = write_file(dir.path(), "p", "", 0o644);
        symlink(dir.path().join("gone"), dir.path().join("l")).unwrap();

        assert_eq!(FileClass::of(dir.path()).unwrap(), FileClass::Directory);
        assert!(matches!(
            FileClass::of(script.path()).unwrap(),
            FileClass::Regular {
                executable: true,
                ..
            }
        ));
        assert!(matches!(
            FileClass::of(plain.path()).unwrap(),
            FileClass::Regular {
                executable: false,
                ..
            }
        ));
        assert_eq!(
            FileClass::of(&dir.path().join("l")).unwrap(),
            FileClass::BrokenSymlink
        );
        assert!(FileClass::of(&dir.path().join("absent")).is_err());
    }

    /// Drop the search bit from `dir` so its entries can be listed but not
    /// stat'ed. Returns false when that has no effect, e.g. when running as root.
    fn forbid_search(dir: &Path, entry: &str) -> bool {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o600)).unwrap();
        if fs::metadata(dir.join(entry)).is_ok() {
            allow_search(dir);
            return false;
        }
        true
    }

    fn allow_search(dir: &Path) {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn stat_failure_is_contained_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "part", "echo ran\n");
        if !forbid_search(dir.path(), "part") {
            return;
        }

        let (result, out) = run(policy(), dir.path(), &mut io::empty());
        allow_search(dir.path());

        assert!(result.is_ok());
        assert_eq!(out, "");
    }

    #[test]
    fn stat_failure_aborts_under_exit_on_error() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "part", "echo ran\n");
        if !forbid_search(dir.path(), "part") {
            return;
        }
        let mut policy = policy();
        policy.exit_on_error = true;

        let (result, out) = run(policy, dir.path(), &mut io::empty());
        allow_search(dir.path());

        let err = result.unwrap_err();
        assert!(matches!(err, RunError::Stat { .. }));
        assert!(err.to_string().starts_with("failed to stat component"));
        assert_eq!(out, "");
    }

    #[test]
    fn stdin_copy_is_removed_after_an_abort() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "1-fail", "readlink /proc/self/fd/0\nexit 1\n");
        write_script(dir.path(), "2-never", "echo never\n");
        let mut policy = policy();
        policy.share_stdin = true;
        policy.exit_on_error = true;
        let mut input = Cursor::new(b"payload".to_vec());

        let (result, out) = run(policy, dir.path(), &mut input);

        assert!(matches!(
            result,
            Err(RunError::Script(ScriptError::NonZeroExit { code: 1, .. }))
        ));
        let copy = Path::new(out.trim_end());
        assert!(copy.is_absolute(), "unexpected stdin path {out:?}");
        assert!(!copy.exists());
    }
}
