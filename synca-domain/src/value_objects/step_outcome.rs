// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The return code of a single `Step` call.

/// Outcome of one `Synchronizer::step` advance.
///
/// `Finished` is sticky: once a caller observes it, no further `Step` call
/// is legal (it returns `SyncError::PipelineClosed` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The pipeline has produced everything it will produce.
    Finished,
    /// A file boundary was crossed (encode: a new file started; decode: a
    /// new file began materializing).
    NextFile,
    /// Ordinary forward progress with no boundary crossed.
    Step,
    /// Decode only: a payload chunk was delivered to the decoder.
    Payload,
}
