//! Built-in descriptors: scalars, `bool`, `()`, raw pointers and opaque
//! `long double` storage
//!
//! Integers narrower than a general register come back from libffi widened
//! to `ffi_arg` / `ffi_sarg`; only the low bits are significant, hence the
//! narrowing casts.

use super::{FfiType, TypeDescriptor};
use core::ptr::addr_of_mut;
use libffi::raw::{ffi_arg, ffi_sarg};

macro_rules! scalar_types {
    ($($ty:ty => $record:ident as $widened:ty;)*) => {$(
        unsafe impl FfiType for $ty {
            type Widened = $widened;

            #[inline]
            fn descriptor() -> TypeDescriptor {
                unsafe { TypeDescriptor::from_raw(addr_of_mut!(libffi::raw::$record)) }
            }

            #[inline]
            fn narrow(raw: $widened) -> Self {
                raw as $ty
            }
        }
    )*};
}

scalar_types! {
    u8 => ffi_type_uint8 as ffi_arg;
    i8 => ffi_type_sint8 as ffi_sarg;
    u16 => ffi_type_uint16 as ffi_arg;
    i16 => ffi_type_sint16 as ffi_sarg;
    u32 => ffi_type_uint32 as ffi_arg;
    i32 => ffi_type_sint32 as ffi_sarg;
    u64 => ffi_type_uint64 as u64;
    i64 => ffi_type_sint64 as i64;
    f32 => ffi_type_float as f32;
    f64 => ffi_type_double as f64;
}

#[cfg(target_pointer_width = "64")]
scalar_types! {
    usize => ffi_type_uint64 as usize;
    isize => ffi_type_sint64 as isize;
}

#[cfg(target_pointer_width = "32")]
scalar_types! {
    usize => ffi_type_uint32 as ffi_arg;
    isize => ffi_type_sint32 as ffi_sarg;
}

unsafe impl FfiType for bool {
    type Widened = ffi_arg;

    #[inline]
    fn descriptor() -> TypeDescriptor {
        unsafe { TypeDescriptor::from_raw(addr_of_mut!(libffi::raw::ffi_type_uint8)) }
    }

    #[inline]
    fn narrow(raw: ffi_arg) -> Self {
        raw as u8 != 0
    }
}

// `void`: the buffer is still register-wide in case the ABI writes into it.
unsafe impl FfiType for () {
    type Widened = ffi_arg;

    #[inline]
    fn descriptor() -> TypeDescriptor {
        unsafe { TypeDescriptor::from_raw(addr_of_mut!(libffi::raw::ffi_type_void)) }
    }

    #[inline]
    fn narrow(_raw: ffi_arg) -> Self {}
}

#[inline]
pub(crate) fn pointer_descriptor() -> TypeDescriptor {
    unsafe { TypeDescriptor::from_raw(addr_of_mut!(libffi::raw::ffi_type_pointer)) }
}

unsafe impl<T> FfiType for *const T {
    type Widened = Self;

    #[inline]
    fn descriptor() -> TypeDescriptor {
        pointer_descriptor()
    }

    #[inline]
    fn narrow(raw: Self) -> Self {
        raw
    }
}

unsafe impl<T> FfiType for *mut T {
    type Widened = Self;

    #[inline]
    fn descriptor() -> TypeDescriptor {
        pointer_descriptor()
    }

    #[inline]
    fn narrow(raw: Self) -> Self {
        raw
    }
}

#[cfg(all(target_arch = "x86_64", not(windows)))]
const LONG_DOUBLE_BYTES: usize = 16;
#[cfg(all(target_arch = "x86", not(windows)))]
const LONG_DOUBLE_BYTES: usize = 12;
#[cfg(all(target_arch = "aarch64", not(windows), not(target_vendor = "apple")))]
const LONG_DOUBLE_BYTES: usize = 16;
#[cfg(not(any(
    all(target_arch = "x86_64", not(windows)),
    all(target_arch = "x86", not(windows)),
    all(target_arch = "aarch64", not(windows), not(target_vendor = "apple"))
)))]
const LONG_DOUBLE_BYTES: usize = 8;

/// Opaque storage for a C `long double`
///
/// Rust has no native type for it, so values travel as raw bytes in the
/// target's encoding (x87 extended on x86, binary128 on aarch64 linux,
/// `double` elsewhere). Targets where this storage disagrees with libffi's
/// record are rejected when a descriptor is prepared.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    any(
        all(target_arch = "x86_64", not(windows)),
        all(target_arch = "aarch64", not(windows), not(target_vendor = "apple"))
    ),
    repr(C, align(16))
)]
#[cfg_attr(all(target_arch = "x86", not(windows)), repr(C, align(4)))]
#[cfg_attr(
    not(any(
        all(target_arch = "x86_64", not(windows)),
        all(target_arch = "x86", not(windows)),
        all(target_arch = "aarch64", not(windows), not(target_vendor = "apple"))
    )),
    repr(C, align(8))
)]
pub struct LongDouble([u8; LONG_DOUBLE_BYTES]);

impl LongDouble {
    /// Storage size on this target
    pub const BYTES: usize = LONG_DOUBLE_BYTES;

    #[inline]
    pub const fn from_bytes(bytes: [u8; LONG_DOUBLE_BYTES]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; LONG_DOUBLE_BYTES] {
        self.0
    }
}

impl core::fmt::Debug for LongDouble {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("LongDouble").field(&self.0).finish()
    }
}

unsafe impl FfiType for LongDouble {
    type Widened = Self;

    #[inline]
    fn descriptor() -> TypeDescriptor {
        unsafe { TypeDescriptor::from_raw(addr_of_mut!(libffi::raw::ffi_type_longdouble)) }
    }

    #[inline]
    fn narrow(raw: Self) -> Self {
        raw
    }
}
