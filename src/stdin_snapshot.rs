use crate::error::RunError;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use tempfile::NamedTempFile;

/// A complete copy of the runner's standard input, stored in a private
/// temporary file so that every script can read it from the beginning.
///
/// The file is removed when the snapshot is dropped, whichever way the run
/// ends. A failed removal is logged and otherwise ignored.
pub struct StdinSnapshot {
    file: Option<NamedTempFile>,
}

impl StdinSnapshot {
    /// Copy all of `input` into a fresh temporary file.
    pub fn capture(input: &mut dyn Read) -> Result<Self, RunError> {
        let mut file = NamedTempFile::new()
            .map_err(|e| RunError::Snapshot(format!("couldn't create temporary file: {e}")))?;
        let copied = io::copy(input, &mut file);
        let snapshot = Self { file: Some(file) };

        // On failure the partial copy is dropped, and thereby removed, here.
        copied.map_err(|e| RunError::Snapshot(format!("couldn't copy stdin: {e}")))?;
        Ok(snapshot)
    }

    /// Rewind to the first byte and hand out a handle for the next script.
    ///
    /// The handle shares its file offset with the snapshot, so whatever the
    /// previous script consumed is undone by the next rewind.
    pub fn rewind(&mut self) -> io::Result<File> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(0))?;
        file.as_file().try_clone()
    }

    fn file_mut(&mut self) -> io::Result<&mut NamedTempFile> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("stdin snapshot already released"))
    }

    #[cfg(test)]
    fn path(&self) -> Option<std::path::PathBuf> {
        self.file.as_ref().map(|f| f.path().to_path_buf())
    }
}

impl Drop for StdinSnapshot {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                tracing::warn!("couldn't remove file {:?}: {}", path, e);
            }
        }
    }
}
