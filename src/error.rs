//! Error types
//!
//! Only call descriptor construction can fail. Everything downstream of a
//! prepared descriptor (bind, call, return accessors) is infallible.

use libffi::raw::ffi_status;
use thiserror::Error;

/// Failure reported by `ffi_prep_cif`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum PrepError {
    /// The return/parameter type description is structurally invalid
    #[error("bad type layout: the signature's type description was rejected")]
    BadTypeLayout,
    /// The requested calling convention is not available on this platform
    #[error("unsupported calling convention")]
    UnsupportedAbi,
}

impl PrepError {
    /// Map a non-OK libffi status onto an error kind.
    ///
    /// `FFI_BAD_ABI` is the only convention failure; every other status
    /// (`FFI_BAD_TYPEDEF`, `FFI_BAD_ARGTYPE`) concerns the type layout.
    pub(crate) fn from_status(status: ffi_status) -> Option<Self> {
        use libffi::raw::{ffi_status_FFI_BAD_ABI, ffi_status_FFI_OK};

        if status == ffi_status_FFI_OK {
            None
        } else if status == ffi_status_FFI_BAD_ABI {
            Some(Self::UnsupportedAbi)
        } else {
            Some(Self::BadTypeLayout)
        }
    }
}

/// Crate-wide result alias
pub type Result<T, E = PrepError> = std::result::Result<T, E>;
