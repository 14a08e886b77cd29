//! Call descriptor - a prepared `ffi_cif` for one compile-time signature
//!
//! Design: all validation happens here, once. A descriptor that constructs
//! successfully can be bound and called any number of times without further
//! checks.


use crate::abi::Abi;
use crate::callable::Callable;
use crate::error::{PrepError, Result};
use crate::signature::{ArgList, Signature};
use crate::types::{layout_lock, Param, TypeDescriptor};
use core::ffi::c_uint;
use core::fmt;
use core::marker::PhantomData;
use core::ptr;
use libffi::raw::{ffi_cif, ffi_prep_cif, ffi_type};
use tracing::{debug, warn};

/// Prepared call interface for signature `F`
///
/// Not `Clone`. Binding borrows the descriptor, so it cannot move while
/// any `Callable` refers to it.
pub struct Cif<F: Signature> {
    raw: ffi_cif,
    // Referenced by `raw.arg_types`; heap-allocated so moving `Cif` keeps it valid.
    params: Box<[TypeDescriptor]>,
    ret: TypeDescriptor,
    abi: Abi,
    _signature: PhantomData<fn() -> F>,
}

// `raw` is never written after preparation and every record it points at
// lives for the whole process.
unsafe impl<F: Signature> Send for Cif<F> {}
unsafe impl<F: Signature> Sync for Cif<F> {}

impl<F: Signature> Cif<F> {
    /// Prepare a descriptor for the platform default convention
    pub fn new() -> Result<Self> {
        Self::with_abi(Abi::default())
    }

    /// Prepare a descriptor for an explicit convention
    ///
    /// Fails with `PrepError::BadTypeLayout` if libffi rejects the types or
    /// if a computed aggregate layout disagrees with the Rust type, and with
    /// `PrepError::UnsupportedAbi` if the convention is unavailable.
    pub fn with_abi(abi: Abi) -> Result<Self> {
        let param_info = <F::Args as ArgList>::params();
        let ret_info = Param::of::<F::Output>();
        debug_assert_eq!(param_info.len(), F::ARITY);

        if let Some(index) = param_info.iter().position(|param| param.descriptor.is_void()) {
            warn!(
                target: "cifbind::cif",
                signature = core::any::type_name::<F>(),
                position = index + 1,
                "void is only valid as a return type"
            );
            return Err(PrepError::BadTypeLayout);
        }

        let mut params: Box<[TypeDescriptor]> =
            param_info.iter().map(|param| param.descriptor).collect();
        let arg_types = if params.is_empty() {
            ptr::null_mut()
        } else {
            params.as_mut_ptr().cast::<*mut ffi_type>()
        };

        let mut raw = ffi_cif::default();

        let _guard = layout_lock();
        let status = unsafe {
            ffi_prep_cif(
                &mut raw,
                abi.as_raw(),
                F::ARITY as c_uint,
                ret_info.descriptor.as_raw(),
                arg_types,
            )
        };

        if let Some(err) = PrepError::from_status(status) {
            warn!(
                target: "cifbind::cif",
                signature = core::any::type_name::<F>(),
                %abi,
                status,
                error = %err,
                "call interface preparation failed"
            );
            return Err(err);
        }

        if let Some(index) = first_layout_mismatch(&ret_info, &param_info) {
            warn!(
                target: "cifbind::cif",
                signature = core::any::type_name::<F>(),
                position = index,
                "type descriptor disagrees with the Rust layout"
            );
            return Err(PrepError::BadTypeLayout);
        }

        debug!(
            target: "cifbind::cif",
            signature = core::any::type_name::<F>(),
            arity = F::ARITY,
            %abi,
            "prepared call interface"
        );

        Ok(Self {
            raw,
            params,
            ret: ret_info.descriptor,
            abi,
            _signature: PhantomData,
        })
    }

    /// Bind a function sharing this signature
    #[inline]
    pub fn bind(&self, function: F) -> Callable<'_, F> {
        Callable::new(self, function)
    }

    /// Number of parameters
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Calling convention the descriptor was prepared for
    #[inline]
    pub fn abi(&self) -> Abi {
        self.abi
    }

    #[inline]
    pub fn return_type(&self) -> TypeDescriptor {
        self.ret
    }

    /// Parameter descriptors, in declaration order
    #[inline]
    pub fn param_types(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// Prepared descriptor, for `ffi_call`
    #[inline]
    pub(crate) fn as_raw_ptr(&self) -> *mut ffi_cif {
        &self.raw as *const ffi_cif as *mut ffi_cif
    }
}

/// Position of the first value whose libffi layout disagrees with Rust's
///
/// `None` when everything agrees; the return value reports as `0`, the
/// parameters as `1..=arity`. A `void` return carries no value and is
/// skipped.
fn first_layout_mismatch(ret: &Param, params: &[Param]) -> Option<usize> {
    if !ret.descriptor.is_void() && !ret.layout_matches() {
        return Some(0);
    }
    params
        .iter()
        .position(|param| !param.layout_matches())
        .map(|index| index + 1)
}

impl<F: Signature> fmt::Debug for Cif<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cif")
            .field("signature", &core::any::type_name::<F>())
            .field("abi", &self.abi)
            .field("arity", &self.arity())
            .field("return_type", &self.ret)
            .field("param_types", &self.params)
            .finish()
    }
}
