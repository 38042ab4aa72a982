// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Chunker
//!
//! The rolling-hash content-defined splitter. Out of scope as a designed
//! algorithm per the synchronizer's own purpose statement — the
//! synchronizer only needs the contract below, not a particular cut
//! function. `synca-core` ships one concrete gear-hash implementation.

/// Result of scanning a byte slice for the next content-defined cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutPoint {
    /// A cut was found at this offset within the slice passed to `scan`.
    /// Bytes `[0, offset)` belong to the chunk that just closed; bytes
    /// `[offset, len)` have not yet been scanned.
    Cut(usize),
    /// No cut point in this slice; all of it belongs to the pending chunk.
    NoCut,
}

/// A stateful rolling-hash scanner. State persists across calls to `scan`
/// within one chunk (the position-since-last-cut counter and the rolling
/// hash window); a returned `Cut` implicitly resets that state for the next
/// chunk.
pub trait Chunker: Send {
    /// Scans `data` from its start for the next cut point.
    fn scan(&mut self, data: &[u8]) -> CutPoint;
}
