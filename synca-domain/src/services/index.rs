// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Index
//!
//! An ordered list of `(object id, size)` records plus a trailing
//! archive-level digest. The synchronizer treats the on-disk representation
//! opaquely apart from record-at-a-time framing; `synca-core` provides the
//! concrete binary format.

use crate::error::SyncError;
use crate::value_objects::ObjectId;

/// One chunk's entry in the index: the id it was stored under, and the
/// length of the bytes it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: ObjectId,
    pub size: u64,
}

/// Writer side of the index, used only in ENCODE.
pub trait IndexWriter: Send {
    /// Appends one chunk record. Must be called after the chunk has been
    /// durably `put` into the writable store (store-put-before-index-append
    /// ordering is the synchronizer's responsibility, not this trait's).
    fn write_object(&mut self, record: IndexRecord) -> Result<(), SyncError>;

    /// Records the archive-level digest, set exactly once at finalization.
    fn set_digest(&mut self, digest: ObjectId) -> Result<(), SyncError>;

    /// Writes the trailing end-of-stream marker.
    fn write_eof(&mut self) -> Result<(), SyncError>;

    /// Flushes and closes the index. Consumes the writer so a caller cannot
    /// write to a closed index.
    fn close(self: Box<Self>) -> Result<(), SyncError>;
}

/// Outcome of reading the next index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadObject {
    Record(IndexRecord),
    /// The end-of-stream marker was reached.
    Eof,
}

/// Reader side of the index, used only in DECODE.
pub trait IndexReader: Send {
    fn read_object(&mut self) -> Result<ReadObject, SyncError>;
}
