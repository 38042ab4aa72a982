// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Synchronizer Core
//!
//! Concrete implementations wired around the `synca-domain` service traits:
//!
//! - [`application::Synchronizer`] — the orchestration state machine.
//! - [`infrastructure::chunker::GearChunker`] — rolling-hash content-defined
//!   chunking.
//! - [`infrastructure::store::FsStore`] — a sharded filesystem
//!   content-addressed object store.
//! - [`infrastructure::index::BinaryIndex{Writer,Reader}`] — the on-disk
//!   index format.
//! - [`infrastructure::archive::TreeCodec`] (encoder/decoder) — a
//!   deliberately simple directory-tree archive framing.
//!
//! This crate performs real filesystem I/O; `synca-domain` stays pure.

pub mod application;
pub mod infrastructure;

pub use application::Synchronizer;
pub use infrastructure::archive::{TreeDecoder, TreeEncoder};
pub use infrastructure::chunker::GearChunker;
pub use infrastructure::index::{BinaryIndexReader, BinaryIndexWriter};
pub use infrastructure::store::FsStore;
