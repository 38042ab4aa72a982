// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Chunker Parameters
//!
//! The min/avg/max byte bounds that govern the rolling-hash chunker's
//! content-defined cut points. Validated the way the teacher validates its
//! `ChunkSize` value object: construction fails closed rather than clamping
//! silently.

use crate::error::SyncError;

/// Default target chunk size: 64 KiB average, matching typical
/// content-defined chunking defaults for small-to-medium file archives.
pub const DEFAULT_AVG_SIZE: usize = 64 * 1024;
const DEFAULT_MIN_SIZE: usize = DEFAULT_AVG_SIZE / 4;
const DEFAULT_MAX_SIZE: usize = DEFAULT_AVG_SIZE * 4;

/// Validated bounds for the content-defined chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerParams {
    min_size: usize,
    avg_size: usize,
    max_size: usize,
}

impl ChunkerParams {
    /// Builds a validated parameter set. `avg_size` must be a power of two
    /// (it directly determines the cut-point bitmask) and
    /// `min_size <= avg_size <= max_size` must hold.
    pub fn new(min_size: usize, avg_size: usize, max_size: usize) -> Result<Self, SyncError> {
        if avg_size == 0 || !avg_size.is_power_of_two() {
            return Err(SyncError::invalid_argument(format!(
                "chunker avg_size {avg_size} must be a nonzero power of two"
            )));
        }
        if !(min_size <= avg_size && avg_size <= max_size) {
            return Err(SyncError::invalid_argument(format!(
                "chunker bounds must satisfy min_size <= avg_size <= max_size, got \
                 {min_size} <= {avg_size} <= {max_size}"
            )));
        }
        if min_size == 0 {
            return Err(SyncError::invalid_argument("chunker min_size must be nonzero"));
        }
        Ok(Self {
            min_size,
            avg_size,
            max_size,
        })
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The bitmask tested against the rolling hash: `avg_size - 1`, since
    /// `avg_size` is a power of two.
    pub fn cut_mask(&self) -> u64 {
        (self.avg_size as u64) - 1
    }
}

impl Default for ChunkerParams {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SIZE, DEFAULT_AVG_SIZE, DEFAULT_MAX_SIZE)
            .expect("default chunker bounds are always valid")
    }
}
