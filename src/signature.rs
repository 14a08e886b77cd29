//! Compile-time signatures
//!
//! A signature is an `extern "C" fn` or `unsafe extern "C" fn` pointer
//! type; functions declared in `extern` blocks have the latter. One macro
//! expansion per arity implements:
//! - `ArgList` for the argument tuple (descriptors and field addresses, in
//!   index order)
//! - `Signature` for the fn pointer type
//! - `FfiType` for the fn pointer type and its `Option`, both passed as a
//!   generic pointer

use crate::types::{pointer_descriptor, FfiType, Param, TypeDescriptor};
use core::ffi::c_void;
use core::ptr::addr_of_mut;
use libffi::middle::CodePtr;
use smallvec::{smallvec, SmallVec};

/// Inline capacity of per-call argument tables; larger arities spill to the heap
pub const INLINE_ARGS: usize = 8;

/// Raw argument address table handed to `ffi_call`
pub type ArgAddresses = SmallVec<[*mut c_void; INLINE_ARGS]>;

/// Ordered parameter list of a signature, as an owned tuple
///
/// # Safety
/// `params()` and `addresses()` must both enumerate exactly `ARITY` fields,
/// in the same order, and each address must point at the field whose
/// descriptor sits at the same index.
pub unsafe trait ArgList: Sized {
    /// Number of parameters
    const ARITY: usize;

    /// Descriptor and Rust layout of each parameter
    fn params() -> SmallVec<[Param; INLINE_ARGS]>;

    /// Address of each field of `self`
    fn addresses(&mut self) -> ArgAddresses;
}

/// Function signature fixed at compile time
///
/// # Safety
/// `code_ptr()` must return the entry point of a function whose machine
/// signature is `Output(Args...)` under the C calling convention.
pub unsafe trait Signature: Copy {
    /// Parameter types, as a tuple
    type Args: ArgList;
    /// Return type; `()` for void
    type Output: FfiType;

    /// Number of parameters
    const ARITY: usize = <Self::Args as ArgList>::ARITY;

    /// Entry point address
    fn code_ptr(self) -> CodePtr;
}

macro_rules! one {
    ($_t:ident) => {
        1
    };
}

macro_rules! fn_pointer {
    ([$($arg:ident),*] $fn_ty:ty) => {
        unsafe impl<R: FfiType, $($arg: FfiType),*> Signature for $fn_ty {
            type Args = ($($arg,)*);
            type Output = R;

            #[inline]
            fn code_ptr(self) -> CodePtr {
                CodePtr(self as *mut c_void)
            }
        }

        unsafe impl<R: FfiType, $($arg: FfiType),*> FfiType for $fn_ty {
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

        unsafe impl<R: FfiType, $($arg: FfiType),*> FfiType for Option<$fn_ty> {
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
    };
}

macro_rules! signatures {
    ($( ($($arg:ident : $idx:tt),*) )*) => {$(
        unsafe impl<$($arg: FfiType),*> ArgList for ($($arg,)*) {
            const ARITY: usize = 0 $(+ one!($arg))*;

            #[inline]
            fn params() -> SmallVec<[Param; INLINE_ARGS]> {
                smallvec![$(Param::of::<$arg>()),*]
            }

            #[inline]
            fn addresses(&mut self) -> ArgAddresses {
                smallvec![$(addr_of_mut!(self.$idx).cast::<c_void>()),*]
            }
        }

        fn_pointer!([$($arg),*] extern "C" fn($($arg),*) -> R);
        fn_pointer!([$($arg),*] unsafe extern "C" fn($($arg),*) -> R);
    )*};
}

signatures! {
    ()
    (A0: 0)
    (A0: 0, A1: 1)
    (A0: 0, A1: 1, A2: 2)
    (A0: 0, A1: 1, A2: 2, A3: 3)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9, A10: 10)
    (A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9, A10: 10, A11: 11)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    type Nullary = extern "C" fn() -> i32;
    type Mixed = extern "C" fn(u8, f64, *const u8, i64);
    type UnsafeMixed = unsafe extern "C" fn(u8, f64, *const u8, i64);

    #[test]
    fn arity_follows_parameter_count() {
        assert_eq!(<Nullary as Signature>::ARITY, 0);
        assert_eq!(<Mixed as Signature>::ARITY, 4);
        assert_eq!(<(i32, i32, i32) as ArgList>::ARITY, 3);
    }

    #[test]
    fn params_in_declaration_order() {
        let kinds: Vec<_> = <<Mixed as Signature>::Args as ArgList>::params()
            .iter()
            .map(|p| p.descriptor.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![TypeKind::U8, TypeKind::Double, TypeKind::Pointer, TypeKind::I64]
        );
    }

    #[test]
    fn nullary_has_no_params_or_addresses() {
        assert!(<() as ArgList>::params().is_empty());
        assert!(().addresses().is_empty());
    }

    #[test]
    fn addresses_point_at_fields() {
        let mut args = (1u8, 2.5f64, 7i64);
        let addresses = args.addresses();
        assert_eq!(addresses.len(), 3);
        unsafe {
            assert_eq!(*addresses[0].cast::<u8>(), 1);
            assert_eq!(*addresses[1].cast::<f64>(), 2.5);
            assert_eq!(*addresses[2].cast::<i64>(), 7);
        }
    }

    #[test]
    fn twelve_arguments_spill_past_inline_capacity() {
        let mut args = (0u8, 1u8, 2u8, 3u8, 4u8, 5u8, 6u8, 7u8, 8u8, 9u8, 10u8, 11u8);
        let addresses = args.addresses();
        assert_eq!(addresses.len(), 12);
        for (i, address) in addresses.iter().enumerate() {
            assert_eq!(unsafe { *address.cast::<u8>() }, i as u8);
        }
    }

    #[test]
    fn function_pointers_are_pointers() {
        assert_eq!(<Nullary as FfiType>::descriptor().kind(), TypeKind::Pointer);
        assert_eq!(<Option<Nullary> as FfiType>::descriptor().kind(), TypeKind::Pointer);
        assert_eq!(<UnsafeMixed as FfiType>::descriptor().kind(), TypeKind::Pointer);
        assert_eq!(<Option<UnsafeMixed> as FfiType>::descriptor().kind(), TypeKind::Pointer);
    }

    #[test]
    fn unsafe_pointers_are_signatures() {
        assert_eq!(<UnsafeMixed as Signature>::ARITY, 4);
        let kinds: Vec<_> = <<UnsafeMixed as Signature>::Args as ArgList>::params()
            .iter()
            .map(|param| param.descriptor.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![TypeKind::U8, TypeKind::Double, TypeKind::Pointer, TypeKind::I64]
        );
    }
}
