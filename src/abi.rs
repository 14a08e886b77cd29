//! Calling convention selection
//!
//! Maps the conventions a caller can request onto libffi's `ffi_abi` tags.
//! Availability is decided by libffi at preparation time, so an unknown or
//! foreign tag is reported as `PrepError::UnsupportedAbi` there.

use core::fmt;
use libffi::raw::{ffi_abi, ffi_abi_FFI_DEFAULT_ABI};

/// Calling convention (ABI variant) requested for a call descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Abi {
    /// Platform default convention
    #[default]
    Default,
    /// System V AMD64 ABI (Unix x86-64)
    #[cfg(all(target_arch = "x86_64", not(windows)))]
    SysV,
    /// Microsoft x64 calling convention
    #[cfg(target_arch = "x86_64")]
    Win64,
    /// AAPCS64 (ARM64)
    #[cfg(all(target_arch = "aarch64", not(windows)))]
    Aarch64,
    /// Raw libffi tag, passed through unchecked
    Raw(ffi_abi),
}

impl Abi {
    /// Platform default convention
    #[inline]
    pub const fn native() -> Self {
        Self::Default
    }

    /// libffi tag for this convention
    #[inline]
    pub fn as_raw(self) -> ffi_abi {
        match self {
            Self::Default => ffi_abi_FFI_DEFAULT_ABI,
            #[cfg(all(target_arch = "x86_64", not(windows)))]
            Self::SysV => libffi::raw::ffi_abi_FFI_UNIX64,
            #[cfg(target_arch = "x86_64")]
            Self::Win64 => libffi::raw::ffi_abi_FFI_WIN64,
            #[cfg(all(target_arch = "aarch64", not(windows)))]
            Self::Aarch64 => libffi::raw::ffi_abi_FFI_SYSV,
            Self::Raw(tag) => tag,
        }
    }

    /// Whether this resolves to the platform default tag
    #[inline]
    pub fn is_native(self) -> bool {
        self.as_raw() == ffi_abi_FFI_DEFAULT_ABI
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            #[cfg(all(target_arch = "x86_64", not(windows)))]
            Self::SysV => f.write_str("sysv64"),
            #[cfg(target_arch = "x86_64")]
            Self::Win64 => f.write_str("win64"),
            #[cfg(all(target_arch = "aarch64", not(windows)))]
            Self::Aarch64 => f.write_str("aapcs64"),
            Self::Raw(tag) => write!(f, "raw({})", tag),
        }
    }
}

impl From<ffi_abi> for Abi {
    #[inline]
    fn from(tag: ffi_abi) -> Self {
        Self::Raw(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_native() {
        assert_eq!(Abi::default(), Abi::native());
        assert!(Abi::Default.is_native());
        assert_eq!(Abi::Default.as_raw(), ffi_abi_FFI_DEFAULT_ABI);
    }

    #[test]
    fn raw_passes_through() {
        let abi = Abi::from(ffi_abi_FFI_DEFAULT_ABI);
        assert_eq!(abi.as_raw(), ffi_abi_FFI_DEFAULT_ABI);
        assert!(abi.is_native());
        assert!(!Abi::Raw(ffi_abi::MAX).is_native());
    }

    #[cfg(all(target_arch = "x86_64", not(windows)))]
    #[test]
    fn sysv_is_native_on_unix_x86_64() {
        assert!(Abi::SysV.is_native());
        assert!(!Abi::Win64.is_native());
    }

    #[test]
    fn display() {
        assert_eq!(Abi::Default.to_string(), "default");
        assert_eq!(Abi::Raw(7).to_string(), "raw(7)");
    }
}
