//! Bound callable - a call descriptor paired with one entry point

use crate::cif::Cif;
use crate::context::InvocationContext;
use crate::error::Result;
use crate::signature::Signature;
use core::fmt;
use libffi::middle::CodePtr;

/// Function bound to a prepared descriptor
///
/// Holds two references and nothing else: cheap to copy, and safe to call
/// from many threads at once since each call gets its own context.
pub struct Callable<'cif, F: Signature> {
    cif: &'cif Cif<F>,
    function: F,
}

impl<'cif, F: Signature> Callable<'cif, F> {
    #[inline]
    pub fn new(cif: &'cif Cif<F>, function: F) -> Self {
        Self { cif, function }
    }

    /// Call synchronously, keeping the arguments and result in a context
    #[inline]
    pub fn call(&self, args: F::Args) -> InvocationContext<'cif, F> {
        InvocationContext::new(*self, args)
    }

    /// Call synchronously and move the result out
    #[inline]
    pub fn invoke(&self, args: F::Args) -> F::Output {
        self.call(args).into_ret()
    }

    #[inline]
    pub fn cif(&self) -> &'cif Cif<F> {
        self.cif
    }

    /// The bound function
    #[inline]
    pub fn function(&self) -> F {
        self.function
    }

    /// Entry point address
    #[inline]
    pub fn code_ptr(&self) -> CodePtr {
        self.function.code_ptr()
    }
}

impl<F: Signature> Clone for Callable<'_, F> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Signature> Copy for Callable<'_, F> {}

impl<F: Signature> fmt::Debug for Callable<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("signature", &core::any::type_name::<F>())
            .field("code", &self.code_ptr().0)
            .finish()
    }
}

/// One-shot call: prepare a descriptor, bind `function` and call it
///
/// Preparing is the expensive part; keep a `Cif` around when calling the
/// same signature repeatedly.
pub fn call<F: Signature>(function: F, args: F::Args) -> Result<F::Output> {
    let cif = Cif::<F>::new()?;
    Ok(cif.bind(function).invoke(args))
}
