// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Synchronizer Domain
//!
//! Pure domain types for the content-addressed archive synchronizer: the
//! value objects fixed at construction or validated at configuration time,
//! the closed error enum, and the trait surface that the synchronizer's
//! collaborators (chunker, object store, index, archive codec) implement.
//!
//! This crate performs no filesystem I/O of its own, save for the hashing
//! primitive in [`value_objects::object_id`], which is a domain concern the
//! same way checksum calculation is a domain concern in most DDD-flavored
//! processing pipelines: content-addressing *is* the business rule here,
//! not an infrastructure detail bolted on afterward.

pub mod error;
pub mod services;
pub mod value_objects;

pub use error::SyncError;
pub use value_objects::{
    effective_perm_mode, validate_perm_mode, BaseMode, ChunkerParams, Direction, ObjectId, RunningDigest, StepOutcome,
    DEFAULT_PERM_MODE,
};
pub use services::{
    ArchiveDecoder, ArchiveEncoder, Chunker, CutPoint, DecodeStep, EncodeStep, IndexReader, IndexRecord, IndexWriter,
    ObjectStore, ReadObject,
};
