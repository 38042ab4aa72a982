// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The direction a `Synchronizer` is fixed to at construction. Exactly one
//! direction for the lifetime of the instance — there is no interleaving of
//! encode and decode on the same session.

/// Which way a `Synchronizer` session moves bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Filesystem tree → archive bytes → chunks + index.
    Encode,
    /// Index + chunks → archive bytes → filesystem tree.
    Decode,
}

impl Direction {
    pub fn is_encode(self) -> bool {
        matches!(self, Direction::Encode)
    }

    pub fn is_decode(self) -> bool {
        matches!(self, Direction::Decode)
    }
}
