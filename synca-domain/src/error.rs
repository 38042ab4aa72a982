// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Domain-specific errors for the synchronizer.
//!
//! Mirrors the kinds enumerated in the synchronizer's error design: a small,
//! closed set of failure categories rather than a free-form message bag, so
//! callers can match on `SyncError` variants instead of parsing strings.

use thiserror::Error;

/// Errors surfaced by the synchronizer and its collaborators.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Null handle, out-of-range mode bits, or an otherwise malformed
    /// argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A write-once field was reconfigured, or the archive digest was read
    /// before the pipeline reached EOF.
    #[error("busy: {0}")]
    Busy(String),

    /// The requested operation is not valid for this `Direction`, or for the
    /// sources currently configured.
    #[error("direction mismatch: {0}")]
    DirectionMismatch(String),

    /// A required piece of configuration (e.g. `base_mode` for a DECODE path
    /// target) is missing at `Start`.
    #[error("not ready: {0}")]
    NotReady(String),

    /// A chunk id was absent from every configured store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A chunk's fetched size disagreed with its index record.
    #[error("bad message: {0}")]
    BadMessage(String),

    /// `Step` was called after the pipeline reached EOF.
    #[error("pipeline closed")]
    PipelineClosed,

    /// Allocation failure surfaced from a collaborator.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Propagated verbatim from the filesystem or an underlying stream.
    #[error("I/O error: {0}")]
    Io(String),
}

impl SyncError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn direction_mismatch(msg: impl Into<String>) -> Self {
        Self::DirectionMismatch(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_message(msg: impl Into<String>) -> Self {
        Self::BadMessage(msg.into())
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Whether a caller may reasonably retry the `Step` that produced this
    /// error. Decoder/encoder internal errors and `BadMessage` are terminal
    /// per the synchronizer's propagation policy; everything routed through
    /// here as `Io` is a transient-I/O candidate for retry at the caller's
    /// discretion.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::Io(_) | SyncError::OutOfMemory(_))
    }

    /// Coarse category, used for logging/metrics-free diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::InvalidArgument(_) => "argument",
            SyncError::Busy(_) => "state",
            SyncError::DirectionMismatch(_) => "state",
            SyncError::NotReady(_) => "configuration",
            SyncError::NotFound(_) => "store",
            SyncError::BadMessage(_) => "integrity",
            SyncError::PipelineClosed => "state",
            SyncError::OutOfMemory(_) => "resource",
            SyncError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_kind() {
        assert_eq!(SyncError::busy("x").category(), "state");
        assert_eq!(SyncError::not_found("x").category(), "store");
        assert_eq!(SyncError::PipelineClosed.category(), "state");
    }

    #[test]
    fn io_errors_are_recoverable() {
        let err: SyncError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(err.is_recoverable());
        assert!(!SyncError::bad_message("size mismatch").is_recoverable());
    }
}
