// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Concrete adapters for the domain's service traits: a gear-hash chunker,
//! a filesystem content-addressed store, a binary index format, and a
//! tree archive codec, plus the shared filesystem helpers they all lean on.

pub mod archive;
pub mod chunker;
pub mod fs_util;
pub mod index;
pub mod store;
