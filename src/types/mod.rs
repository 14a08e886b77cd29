//! Type descriptor registry - maps Rust value types onto libffi type records
//!
//! Design: capability-based dispatch through the `FfiType` trait:
//! - `builtin.rs` - scalars, `bool`, `()`, raw pointers
//! - `registry.rs` - process-wide memoized aggregate records keyed by `TypeId`
//! - `structs.rs` - `ffi_struct!` for `#[repr(C)]` aggregates
//!
//! Function pointer types get their (pointer) descriptor next to their
//! `Signature` impls.

mod builtin;
mod registry;
mod structs;


pub use builtin::LongDouble;
pub use registry::TypeRegistry;
pub(crate) use builtin::pointer_descriptor;
pub(crate) use registry::layout_lock;

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;
use libffi::raw::ffi_type;

/// Value type usable as a parameter or return type of a signature
///
/// # Safety
/// `descriptor()` must describe exactly the in-memory layout of `Self`, and
/// `Widened` must be the storage libffi writes a returned `Self` into
/// (at least `ffi_arg` wide for integers narrower than a register).
/// A lying implementation makes every call through it undefined behavior.
pub unsafe trait FfiType: Sized {
    /// Return-value storage handed to `ffi_call`
    type Widened;

    /// Process-lifetime type record for `Self`
    fn descriptor() -> TypeDescriptor;

    /// Recover `Self` from its widened return storage
    fn narrow(raw: Self::Widened) -> Self;
}

/// Classification of a libffi type record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Int,
    Float,
    Double,
    LongDouble,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Struct,
    Pointer,
    Unknown(u16),
}

impl TypeKind {
    /// Decode a raw `ffi_type::type_` tag
    pub const fn from_tag(tag: u16) -> Self {
        use libffi::raw::{
            FFI_TYPE_DOUBLE, FFI_TYPE_FLOAT, FFI_TYPE_INT, FFI_TYPE_LONGDOUBLE, FFI_TYPE_POINTER,
            FFI_TYPE_SINT16, FFI_TYPE_SINT32, FFI_TYPE_SINT64, FFI_TYPE_SINT8, FFI_TYPE_STRUCT,
            FFI_TYPE_UINT16, FFI_TYPE_UINT32, FFI_TYPE_UINT64, FFI_TYPE_UINT8, FFI_TYPE_VOID,
        };

        match tag as u32 {
            FFI_TYPE_VOID => Self::Void,
            FFI_TYPE_INT => Self::Int,
            FFI_TYPE_FLOAT => Self::Float,
            FFI_TYPE_DOUBLE => Self::Double,
            FFI_TYPE_LONGDOUBLE => Self::LongDouble,
            FFI_TYPE_UINT8 => Self::U8,
            FFI_TYPE_SINT8 => Self::I8,
            FFI_TYPE_UINT16 => Self::U16,
            FFI_TYPE_SINT16 => Self::I16,
            FFI_TYPE_UINT32 => Self::U32,
            FFI_TYPE_SINT32 => Self::I32,
            FFI_TYPE_UINT64 => Self::U64,
            FFI_TYPE_SINT64 => Self::I64,
            FFI_TYPE_STRUCT => Self::Struct,
            FFI_TYPE_POINTER => Self::Pointer,
            _ => Self::Unknown(tag),
        }
    }

    /// Check if kind is integral
    #[inline]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::U8
                | Self::I8
                | Self::U16
                | Self::I16
                | Self::U32
                | Self::I32
                | Self::U64
                | Self::I64
        )
    }

    /// Check if kind is floating point
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::LongDouble)
    }
}

/// Handle to an immutable, process-lifetime libffi type record
///
/// `repr(transparent)` over a non-null `ffi_type` pointer, so a slice of
/// descriptors can be handed to `ffi_prep_cif` as its `atypes` array.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TypeDescriptor(NonNull<ffi_type>);

// Records are either libffi statics or leaked registry entries; neither is
// freed, and layout writes by `ffi_prep_cif` happen under `layout_lock`.
unsafe impl Send for TypeDescriptor {}
unsafe impl Sync for TypeDescriptor {}

impl TypeDescriptor {
    /// Wrap a raw record
    ///
    /// # Safety
    /// `raw` must be non-null and stay valid for the rest of the process.
    #[inline]
    pub const unsafe fn from_raw(raw: *mut ffi_type) -> Self {
        Self(NonNull::new_unchecked(raw))
    }

    /// Raw record pointer, as libffi expects it
    #[inline]
    pub const fn as_raw(self) -> *mut ffi_type {
        self.0.as_ptr()
    }

    /// Type classification
    pub fn kind(self) -> TypeKind {
        let _guard = layout_lock();
        TypeKind::from_tag(unsafe { (*self.as_raw()).type_ })
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self.kind() == TypeKind::Void
    }

    /// Size in bytes; zero for an aggregate not yet laid out by libffi
    pub fn size(self) -> usize {
        let _guard = layout_lock();
        unsafe { (*self.as_raw()).size }
    }

    /// Alignment in bytes; zero for an aggregate not yet laid out by libffi
    pub fn alignment(self) -> usize {
        let _guard = layout_lock();
        unsafe { (*self.as_raw()).alignment as usize }
    }

    /// Field records of an aggregate, in declaration order
    ///
    /// Empty for scalars and for zero-field aggregates.
    pub fn fields(self) -> Vec<TypeDescriptor> {
        let mut fields = Vec::new();
        unsafe {
            let record = &*self.as_raw();
            if TypeKind::from_tag(record.type_) != TypeKind::Struct || record.elements.is_null() {
                return fields;
            }
            let mut cursor = record.elements;
            while !(*cursor).is_null() {
                fields.push(Self::from_raw(*cursor));
                cursor = cursor.add(1);
            }
        }
        fields
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("kind", &self.kind())
            .field("size", &self.size())
            .field("alignment", &self.alignment())
            .finish()
    }
}

/// A descriptor paired with the Rust layout of the type it describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub descriptor: TypeDescriptor,
    pub layout: Layout,
}

impl Param {
    #[inline]
    pub fn of<T: FfiType>() -> Self {
        Self {
            descriptor: T::descriptor(),
            layout: Layout::new::<T>(),
        }
    }

    /// Whether libffi's computed layout agrees with Rust's
    ///
    /// Only meaningful after a successful `ffi_prep_cif`, which lays out
    /// aggregates. `void` never matches: libffi gives it one byte where
    /// `()` has none, so callers exempt the return position themselves.
    pub fn layout_matches(&self) -> bool {
        self.descriptor.size() == self.layout.size()
            && self.descriptor.alignment() == self.layout.align()
    }
}
