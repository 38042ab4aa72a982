// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Object Store
//!
//! A content-addressed blob store: writable (put + get) or seed (get only
//! from the synchronizer's perspective — nothing here stops an
//! implementation from also being writable, but the synchronizer never
//! calls `put` on a seed store).

use crate::error::SyncError;
use crate::value_objects::ObjectId;

/// Content-addressed object storage. `put` is idempotent by id: a store
/// that already holds bytes for `id` may treat a repeat `put` as a no-op.
///
/// `get` returns `Err(SyncError::NotFound)` for a miss — that specific
/// variant is what a `Synchronizer`'s fallback cascade (wstore, then each
/// seed store in order) tests for to decide whether to try the next store.
/// Any other `Err` is returned to the caller verbatim, short-circuiting the
/// cascade.
pub trait ObjectStore: Send + Sync {
    fn put(&self, id: &ObjectId, bytes: &[u8]) -> Result<(), SyncError>;

    fn get(&self, id: &ObjectId) -> Result<Vec<u8>, SyncError>;
}
