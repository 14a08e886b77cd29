//! Aggregate descriptors
//!
//! `ffi_struct!` declares a `#[repr(C)]` struct and registers its record,
//! built from the field descriptors in declaration order. Types declared
//! elsewhere can implement `FfiType` by hand through
//! `TypeRegistry::structure`.

/// Declare a `#[repr(C)]` struct usable by value in signatures
///
/// ```
/// cifbind::ffi_struct! {
///     #[derive(Debug, Clone, Copy, PartialEq)]
///     pub struct Point {
///         pub x: i32,
///         pub y: i32,
///     }
/// }
///
/// use cifbind::FfiType;
/// assert_eq!(Point::descriptor().fields().len(), 2);
/// ```
#[macro_export]
macro_rules! ffi_struct {
    (@impl $name:ident [$($field_ty:ty),*]) => {
        unsafe impl $crate::FfiType for $name {
            type Widened = Self;

            #[inline]
            fn descriptor() -> $crate::TypeDescriptor {
                $crate::TypeRegistry::structure::<Self>(|| {
                    ::std::vec![$(<$field_ty as $crate::FfiType>::descriptor()),*]
                })
            }

            #[inline]
            fn narrow(raw: Self) -> Self {
                raw
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$field_meta:meta])* $field_vis:vis $field:ident : $field_ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(C)]
        $vis struct $name {
            $($(#[$field_meta])* $field_vis $field: $field_ty),*
        }

        $crate::ffi_struct!(@impl $name [$($field_ty),*]);
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[$meta])*
        #[repr(C)]
        $vis struct $name;

        $crate::ffi_struct!(@impl $name []);
    };
}
