// /////////////////////////////////////////////////////////////////////////////
// Content-Addressed Archive Synchronizer
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Validation for the permission bits accepted as `make_perm_mode`.
//!
//! `make_perm_mode` constrains the archive output's creation permissions and
//! is meaningful only in ENCODE. It is restricted to standard read/write
//! bits: no execute bit, no setuid/setgid/sticky bit.

use crate::error::SyncError;

/// Read/write bits for owner, group, other — `0o666`.
const ALLOWED_MASK: u32 = 0o666;

/// Default permission bits used when `make_perm_mode` is unset.
pub const DEFAULT_PERM_MODE: u32 = 0o666;

/// Validates a `make_perm_mode` value, rejecting execute bits and the
/// setuid/setgid/sticky bits.
pub fn validate_perm_mode(mode: u32) -> Result<(), SyncError> {
    if mode & !ALLOWED_MASK != 0 {
        return Err(SyncError::invalid_argument(format!(
            "make_perm_mode {mode:#o} contains bits outside read/write (0o666): only standard \
             read/write permission bits are accepted, no execute or setuid/setgid/sticky bits"
        )));
    }
    Ok(())
}

/// Resolves the effective creation mode: the configured mode masked to
/// read/write bits, or the default if unset.
pub fn effective_perm_mode(configured: Option<u32>) -> u32 {
    match configured {
        Some(mode) => mode & ALLOWED_MASK,
        None => DEFAULT_PERM_MODE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_rw_bits_are_valid() {
        assert!(validate_perm_mode(0o644).is_ok());
        assert!(validate_perm_mode(0o600).is_ok());
        assert!(validate_perm_mode(0o666).is_ok());
    }

    #[test]
    fn execute_and_setuid_bits_are_rejected() {
        assert!(validate_perm_mode(0o755).is_err());
        assert!(validate_perm_mode(0o4666).is_err());
        assert!(validate_perm_mode(0o1666).is_err());
    }

    #[test]
    fn default_applies_when_unset() {
        assert_eq!(effective_perm_mode(None), 0o666);
        assert_eq!(effective_perm_mode(Some(0o640)), 0o640);
    }
}
