// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Archive Encoder / Decoder
//!
//! The framer that turns a filesystem tree into a linear byte stream and
//! back. Named as an external collaborator in the synchronizer's own scope
//! statement — the wire format of the archive itself is not this crate's
//! concern, only the shape of the interface the `Synchronizer` drives it
//! through. `synca-core` ships one concrete, deliberately simple tree codec.

use crate::error::SyncError;
use crate::value_objects::BaseMode;
use std::fs::File;
use std::path::Path;

/// Outcome of one `ArchiveEncoder::step` advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStep {
    /// No more archive bytes will be produced.
    Finished,
    /// A new file's header bytes are available via `get_data`.
    NextFile,
    /// More file content bytes are available via `get_data`.
    Data,
}

/// Produces archive bytes from a base filesystem tree, one `step` at a time.
pub trait ArchiveEncoder: Send {
    /// Transfers ownership of the base tree's root descriptor to the
    /// encoder. Called at most once, at `Synchronizer::start`.
    fn set_base_fd(&mut self, fd: File) -> Result<(), SyncError>;

    fn step(&mut self) -> Result<EncodeStep, SyncError>;

    /// The bytes produced by the most recent `NextFile` or `Data` step.
    fn get_data(&self) -> &[u8];

    fn current_path(&self) -> Option<&Path>;

    fn current_mode(&self) -> Option<u32>;
}

/// Outcome of one `ArchiveDecoder::step` advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// The base tree has been fully materialized.
    Finished,
    /// A new file began materializing.
    NextFile,
    /// Ordinary forward progress.
    Step,
    /// A payload chunk was consumed.
    Payload,
    /// The decoder needs more input bytes before it can make progress.
    Request,
}

/// Materializes a base filesystem tree from archive bytes, one `step` at a
/// time, pulling more input via `put_data`/`put_data_fd` when it signals
/// `DecodeStep::Request`.
pub trait ArchiveDecoder: Send {
    /// Transfers ownership of an already-open base tree descriptor.
    fn set_base_fd(&mut self, fd: File) -> Result<(), SyncError>;

    /// Tells the decoder the shape of the base tree it must create, when no
    /// descriptor is available yet (used with `BaseMode::Dir`).
    fn set_base_mode(&mut self, mode: BaseMode) -> Result<(), SyncError>;

    fn step(&mut self) -> Result<DecodeStep, SyncError>;

    /// Feeds bytes resolved from one chunk (or one record's worth of
    /// archive-fd input) in response to a `DecodeStep::Request`.
    fn put_data(&mut self, bytes: &[u8]) -> Result<(), SyncError>;

    /// Hands the decoder a descriptor for unbounded streaming ingestion,
    /// used when no index is configured.
    fn put_data_fd(&mut self, fd: File) -> Result<(), SyncError>;

    /// Signals that no further input will arrive.
    fn put_eof(&mut self) -> Result<(), SyncError>;

    fn current_path(&self) -> Option<&Path>;

    fn current_mode(&self) -> Option<u32>;
}
