//! Process-wide memoized aggregate records
//!
//! Built-in records are libffi statics and need no bookkeeping. Aggregate
//! records are composed on first use, published once per `TypeId`, and
//! leaked so call descriptors can hold them for the rest of the process.

use super::TypeDescriptor;
use core::any::{type_name, TypeId};
use core::ptr;
use libffi::raw::{ffi_type, FFI_TYPE_STRUCT};
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::HashMap;
use tracing::trace;

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// `ffi_prep_cif` lays out aggregates lazily by writing into their shared
/// records, so preparation and layout reads are serialized on this lock.
static LAYOUT_LOCK: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

#[inline]
pub(crate) fn layout_lock() -> ReentrantMutexGuard<'static, ()> {
    LAYOUT_LOCK.lock()
}

/// Registry of aggregate type records keyed by Rust type identity
pub struct TypeRegistry {
    records: RwLock<HashMap<TypeId, TypeDescriptor>>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry
    #[inline]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Descriptor for aggregate `T`, composing it from `fields` on first use
    ///
    /// `fields` runs outside the registry lock, so it may itself look up
    /// nested aggregates. If two threads race on the same type, one record
    /// is published and the other is dropped.
    pub fn structure<T: 'static>(fields: impl FnOnce() -> Vec<TypeDescriptor>) -> TypeDescriptor {
        Self::global().get_or_compose(TypeId::of::<T>(), type_name::<T>(), fields)
    }

    fn get_or_compose(
        &self,
        id: TypeId,
        name: &'static str,
        fields: impl FnOnce() -> Vec<TypeDescriptor>,
    ) -> TypeDescriptor {
        if let Some(descriptor) = self.records.read().get(&id) {
            return *descriptor;
        }

        let record = AggregateRecord::compose(&fields());

        let mut records = self.records.write();
        if let Some(descriptor) = records.get(&id) {
            return *descriptor;
        }
        let descriptor = record.publish();
        records.insert(id, descriptor);
        trace!(
            target: "cifbind::types",
            aggregate = name,
            fields = descriptor.fields().len(),
            "registered aggregate descriptor"
        );
        descriptor
    }

    /// Descriptor already registered for `T`, if any
    pub fn lookup<T: 'static>(&self) -> Option<TypeDescriptor> {
        self.records.read().get(&TypeId::of::<T>()).copied()
    }

    /// Whether a record for `T` has been published
    #[inline]
    pub fn contains<T: 'static>(&self) -> bool {
        self.lookup::<T>().is_some()
    }

    /// Number of published aggregate records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owned, not-yet-published `FFI_TYPE_STRUCT` record
///
/// Size and alignment start at zero; libffi fills them in the first time the
/// record takes part in a successful preparation.
struct AggregateRecord {
    record: Box<ffi_type>,
    // Null-terminated; `record.elements` points into this allocation.
    elements: Box<[*mut ffi_type]>,
}

impl AggregateRecord {
    fn compose(fields: &[TypeDescriptor]) -> Self {
        let mut elements: Box<[*mut ffi_type]> = fields
            .iter()
            .map(|field| field.as_raw())
            .chain(core::iter::once(ptr::null_mut()))
            .collect();

        let record = Box::new(ffi_type {
            size: 0,
            alignment: 0,
            type_: FFI_TYPE_STRUCT as u16,
            elements: elements.as_mut_ptr(),
        });

        Self { record, elements }
    }

    fn publish(self) -> TypeDescriptor {
        let Self { record, elements } = self;
        Box::leak(elements);
        unsafe { TypeDescriptor::from_raw(Box::leak(record)) }
    }
}
