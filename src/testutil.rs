use crate::command::{Candidate, Stdin};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::rc::Rc;

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> Candidate {
    write_file(dir, name, &format!("#!/bin/sh\n{body}"), 0o755)
}

/// Write `contents` into `dir/name` with the given permission bits.
pub(crate) fn write_file(dir: &Path, name: &str, contents: &str, mode: u32) -> Candidate {
    let candidate = Candidate::new(dir, name.into());
    fs::write(candidate.path(), contents).unwrap();
    fs::set_permissions(candidate.path(), fs::Permissions::from_mode(mode)).unwrap();
    candidate
}

pub(crate) fn null_stdin() -> Box<dyn Stdin> {
    Box::new(File::open("/dev/null").unwrap())
}

/// Writer whose bytes stay readable through a shared handle.
#[derive(Default)]
pub(crate) struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Create a writer and the handle to read back what it collected.
    pub(crate) fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let writer = Self::default();
        let handle = Rc::clone(&writer.buf);
        (writer, handle)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
