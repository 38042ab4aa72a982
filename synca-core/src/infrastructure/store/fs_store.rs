// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Object Store
//!
//! A content-addressed store backed by a directory tree, sharded by the
//! first byte of the object id's hex encoding (`<root>/ab/abcdef...`) so no
//! single directory accumulates every object in the store.

use crate::infrastructure::fs_util;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use synca_domain::{ObjectId, ObjectStore, SyncError};

/// A writable or read-only content-addressed store rooted at a directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Opens (without creating) a store rooted at `root`. Use
    /// [`FsStore::create`] when the root must be materialized first.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Materializes `root` as a directory, tolerating a pre-existing one,
    /// then opens it.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs_util::mkdir_ignore_exists(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        let (shard, rest) = hex.split_at(2);
        self.root.join(shard).join(rest)
    }
}

impl ObjectStore for FsStore {
    fn put(&self, id: &ObjectId, bytes: &[u8]) -> Result<(), SyncError> {
        let path = self.object_path(id);
        if path.exists() {
            return Ok(());
        }
        let shard_dir = path
            .parent()
            .expect("object path always has a shard-directory parent");
        fs_util::mkdir_ignore_exists(shard_dir)?;

        let tmp = fs_util::sibling_temp_path(&path);
        let write_result = fs::write(&tmp, bytes);
        if let Err(e) = write_result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        match fs::rename(&tmp, &path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                // Another writer may have raced us to the same id; since
                // puts are idempotent by content, a now-existing target is
                // not an error.
                if path.exists() {
                    Ok(())
                } else {
                    Err(e.into())
                }
            }
        }
    }

    fn get(&self, id: &ObjectId) -> Result<Vec<u8>, SyncError> {
        let path = self.object_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SyncError::not_found(format!("object {id} not present in store at {}", self.root.display())))
            }
            Err(e) => Err(e.into()),
        }
    }
}
