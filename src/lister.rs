use crate::policy::Order;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

/// Read the names of every entry of `directory`, sorted byte-wise.
///
/// Subdirectories are listed by name but never descended into. Any failure to
/// open the directory or to read one of its entries fails the whole listing.
pub fn list_directory(directory: &Path, order: Order) -> io::Result<Vec<OsString>> {
    let mut names = fs::read_dir(directory)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;

    // OsString compares by its underlying bytes on unix.
    names.sort_unstable();
    if order == Order::Descending {
        names.reverse();
    }
    Ok(names)
}
