//! Invocation context - one call, its arguments and its result
//!
//! Design: construction IS the call.
//! 1. Move the argument tuple to stable heap storage (free for arity 0)
//! 2. Collect field addresses in parameter order
//! 3. Zero a return buffer of the widened return storage
//! 4. `ffi_call`
//! 5. Narrow the buffer once and keep the typed value
//!
//! Dropping the context drops the arguments.


use crate::callable::Callable;
use crate::signature::{ArgAddresses, ArgList, Signature};
use crate::types::FfiType;
use core::ffi::c_void;
use core::fmt;
use core::mem::{self, MaybeUninit};
use core::ptr;
use libffi::raw::ffi_call;
use tracing::trace;

/// A completed call through a `Callable`
pub struct InvocationContext<'cif, F: Signature> {
    callable: Callable<'cif, F>,
    // Boxed so the addresses below stay valid when the context moves.
    args: Box<F::Args>,
    addresses: ArgAddresses,
    ret: F::Output,
}

impl<'cif, F: Signature> InvocationContext<'cif, F> {
    /// Perform the call
    pub fn new(callable: Callable<'cif, F>, args: F::Args) -> Self {
        let mut args = Box::new(args);
        let mut addresses = args.addresses();
        debug_assert_eq!(addresses.len(), <F::Args as ArgList>::ARITY);

        let avalue = if addresses.is_empty() {
            ptr::null_mut()
        } else {
            addresses.as_mut_ptr()
        };

        let code = callable.code_ptr();
        trace!(
            target: "cifbind::call",
            arity = addresses.len(),
            code = ?code.0,
            "calling through prepared interface"
        );

        let mut buffer = MaybeUninit::<<F::Output as FfiType>::Widened>::zeroed();
        let ret = unsafe {
            ffi_call(
                callable.cif().as_raw_ptr(),
                Some(*code.as_fun()),
                buffer.as_mut_ptr().cast::<c_void>(),
                avalue,
            );
            <F::Output as FfiType>::narrow(buffer.assume_init())
        };

        Self {
            callable,
            args,
            addresses,
            ret,
        }
    }

    /// Return value by copy
    #[inline]
    pub fn ret(&self) -> F::Output
    where
        F::Output: Clone,
    {
        self.ret.clone()
    }

    /// Return value by reference, valid while the context lives
    #[inline]
    pub fn ret_ref(&self) -> &F::Output {
        &self.ret
    }

    #[inline]
    pub fn ret_mut(&mut self) -> &mut F::Output {
        &mut self.ret
    }

    /// Move the return value out, leaving the default value behind
    #[inline]
    pub fn take_ret(&mut self) -> F::Output
    where
        F::Output: Default,
    {
        mem::take(&mut self.ret)
    }

    /// Move the return value out, releasing the arguments
    #[inline]
    pub fn into_ret(self) -> F::Output {
        self.ret
    }

    /// Arguments the call was made with
    #[inline]
    pub fn args(&self) -> &F::Args {
        &self.args
    }

    /// Address table handed to `ffi_call`, in parameter order
    #[inline]
    pub fn arg_addresses(&self) -> &[*mut c_void] {
        &self.addresses
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.addresses.len()
    }

    #[inline]
    pub fn callable(&self) -> Callable<'cif, F> {
        self.callable
    }
}

impl<F: Signature> fmt::Debug for InvocationContext<'_, F>
where
    F::Output: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("callable", &self.callable)
            .field("arity", &self.arity())
            .field("ret", &self.ret)
            .finish()
    }
}
