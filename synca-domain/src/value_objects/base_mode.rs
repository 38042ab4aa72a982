// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The kind of filesystem endpoint a DECODE base path materializes to.
//! Meaningful only in DECODE, and only when the base is supplied as a path
//! whose target does not yet exist.

/// Kind of base-tree endpoint a DECODE session will create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMode {
    /// A directory tree, created with `mkdir` (EEXIST ignored).
    Dir,
    /// A single regular file, created with `O_EXCL` via a sibling temp path.
    Reg,
    /// A block device, opened in place for writing — never created.
    Blk,
}
