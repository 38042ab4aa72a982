// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem helpers shared by the store, index, and archive infrastructure:
//! sibling temp path generation and the directory-vs-file open dance used to
//! materialize a base tree endpoint.

use rand::distr::Alphanumeric;
use rand::Rng;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Derives a randomized sibling temp path for `path`, in the same directory
/// so the eventual commit is a same-filesystem rename.
pub fn sibling_temp_path(path: &Path) -> PathBuf {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("archive");
    let mut tmp_name = file_name.to_string();
    tmp_name.push_str(".tmp-");
    tmp_name.push_str(&suffix);
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(tmp_name),
        _ => PathBuf::from(tmp_name),
    }
}

/// Creates a new file at `path`, failing if it already exists (`O_EXCL`),
/// with the given Unix permission bits.
#[cfg(unix)]
pub fn create_exclusive(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
pub fn create_exclusive(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Opens `path`, requiring it to be a directory (`O_DIRECTORY`). Fails with
/// `ENOTDIR` if `path` names a non-directory, letting the caller fall back
/// to a plain file open.
#[cfg(unix)]
pub fn open_as_directory(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new().read(true).custom_flags(libc::O_DIRECTORY).open(path)
}

#[cfg(unix)]
pub fn is_not_a_directory(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOTDIR)
}

#[cfg(not(unix))]
pub fn open_as_directory(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if file.metadata()?.is_dir() {
        Ok(file)
    } else {
        Err(io::Error::from(io::ErrorKind::Other))
    }
}

#[cfg(not(unix))]
pub fn is_not_a_directory(_err: &io::Error) -> bool {
    true
}

/// Creates `path` as a directory, tolerating a pre-existing directory at
/// that path (`EEXIST` is not an error here — the synchronizer may retry
/// materializing the same base across a failed-then-retried session).
pub fn mkdir_ignore_exists(path: &Path) -> io::Result<()> {
    match std::fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Resolves the filesystem path backing an already-open directory
/// descriptor on Linux, via `/proc/self/fd`. Needed because `std::fs::File`
/// has no directory-traversal API of its own — once a directory has been
/// opened (establishing ownership and pinning it against deletion races),
/// traversal still goes through `std::fs::read_dir` on the resolved path.
#[cfg(target_os = "linux")]
pub fn resolve_fd_path(file: &File) -> io::Result<PathBuf> {
    use std::os::unix::io::AsRawFd;
    std::fs::read_link(format!("/proc/self/fd/{}", file.as_raw_fd()))
}

#[cfg(not(target_os = "linux"))]
pub fn resolve_fd_path(_file: &File) -> io::Result<PathBuf> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "resolving a directory fd back to a path requires /proc (Linux only)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_temp_path_stays_in_same_directory() {
        let path = PathBuf::from("/var/lib/archive.idx");
        let tmp = sibling_temp_path(&path);
        assert_eq!(tmp.parent(), Some(Path::new("/var/lib")));
        assert!(tmp.file_name().unwrap().to_str().unwrap().starts_with("archive.idx.tmp-"));
    }
}
