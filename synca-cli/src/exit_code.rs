// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Process exit codes following the BSD `sysexits.h` conventions, mapped
//! from [`synca_domain::SyncError`] variants.

use synca_domain::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    /// Invalid arguments, reconfiguration attempts, or a digest read before EOF.
    UsageError = 64,
    /// A corrupted or otherwise malformed index/archive stream.
    DataError = 65,
    /// A chunk id was absent from every configured store.
    NoInput = 66,
    /// Step called after the pipeline already reached EOF, or any other
    /// internal consistency failure.
    Software = 70,
    /// Propagated filesystem or stream I/O failure.
    IoError = 74,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_sync_error(error: &SyncError) -> Self {
        match error {
            SyncError::InvalidArgument(_) | SyncError::Busy(_) | SyncError::DirectionMismatch(_) | SyncError::NotReady(_) => {
                ExitCode::UsageError
            }
            SyncError::BadMessage(_) => ExitCode::DataError,
            SyncError::NotFound(_) => ExitCode::NoInput,
            SyncError::PipelineClosed | SyncError::OutOfMemory(_) => ExitCode::Software,
            SyncError::Io(_) => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_not_found_to_no_input() {
        let err = SyncError::not_found("missing object");
        assert_eq!(ExitCode::from_sync_error(&err), ExitCode::NoInput);
    }

    #[test]
    fn maps_busy_to_usage_error() {
        let err = SyncError::busy("field already set");
        assert_eq!(ExitCode::from_sync_error(&err), ExitCode::UsageError);
    }

    #[test]
    fn maps_bad_message_to_data_error() {
        let err = SyncError::bad_message("size mismatch");
        assert_eq!(ExitCode::from_sync_error(&err), ExitCode::DataError);
    }

    #[test]
    fn maps_pipeline_closed_to_software() {
        assert_eq!(ExitCode::from_sync_error(&SyncError::PipelineClosed), ExitCode::Software);
    }
}
