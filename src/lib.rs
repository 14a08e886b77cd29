//! cifbind - compile-time typed call interfaces over libffi
//!
//! A signature is an `extern "C" fn` (or `unsafe extern "C" fn`) pointer
//! type. For each signature the
//! crate builds one prepared call descriptor, binds it to any function of
//! that type and performs calls by packing a typed argument tuple into the
//! untyped address table libffi expects.
//!
//! Setup flows strictly downward:
//! - `types` - `FfiType` descriptors for scalars, pointers and aggregates
//! - `cif` - `Cif<F>`, the prepared descriptor (the only fallible step)
//! - `callable` - `Callable<'cif, F>`, a descriptor bound to one function
//! - `context` - `InvocationContext`, one call with its arguments and result
//!
//! ```
//! use cifbind::Cif;
//!
//! extern "C" fn scale(value: i32, factor: f64) -> f64 {
//!     value as f64 * factor
//! }
//!
//! let cif = Cif::<extern "C" fn(i32, f64) -> f64>::new()?;
//! let f = cif.bind(scale);
//! assert_eq!(f.invoke((4, 0.5)), 2.0);
//!
//! let ctx = f.call((3, 2.0));
//! assert_eq!(ctx.ret(), 6.0);
//! assert_eq!(ctx.arity(), 2);
//! # Ok::<(), cifbind::PrepError>(())
//! ```

pub mod abi;
pub mod callable;
pub mod cif;
pub mod config;
pub mod context;
pub mod error;
pub mod library;
pub mod logging;
pub mod signature;
pub mod types;

pub use abi::Abi;
pub use callable::{call, Callable};
pub use cif::Cif;
pub use context::InvocationContext;
pub use error::{PrepError, Result};
pub use library::{Library, LibraryError};
pub use signature::{ArgList, Signature};
pub use types::{FfiType, LongDouble, Param, TypeDescriptor, TypeKind, TypeRegistry};
