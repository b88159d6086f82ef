// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime object model and signature-keyed dispatch.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::SerializationError;
use crate::reader::Reader;
use crate::writer::Writer;

/// A value that travels through the object table.
///
/// Every object carries the type signature under which the peer looks up
/// its field serializer.
pub trait WireObject: Any {
    /// Fully-qualified type signature written ahead of the object's fields.
    fn type_signature(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl fmt::Debug for dyn WireObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WireObject")
            .field(&self.type_signature())
            .finish()
    }
}

/// Shared, possibly cyclic reference to a wire object. Identity (not
/// equality) decides back-references.
pub type ObjectRef = Rc<RefCell<dyn WireObject>>;

/// Writes the fields of an object (its own, then its superclass's).
pub type SerializeFn = fn(&mut Writer<'_>, &dyn WireObject) -> Result<(), SerializationError>;

/// Reads the fields of an already instantiated object.
pub type DeserializeFn =
    fn(&mut Reader<'_>, &mut dyn WireObject) -> Result<(), SerializationError>;

/// Creates an empty instance, possibly consuming leading stream data.
pub type InstantiateFn = fn(&mut Reader<'_>) -> Result<ObjectRef, SerializationError>;

/// Operations available for one type signature. Absent entries are
/// operations this endpoint never needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSerializer {
    /// Field writer.
    pub serialize: Option<SerializeFn>,
    /// Field reader.
    pub deserialize: Option<DeserializeFn>,
    /// Instance factory.
    pub instantiate: Option<InstantiateFn>,
}

/// Signature → [`FieldSerializer`] lookup.
pub trait TypeSerializer {
    /// The field serializer for `signature`, if registered.
    fn serializer(&self, signature: &str) -> Option<&FieldSerializer>;
}

/// Binary search over a table sorted by signature.
pub fn lookup_sorted<'t>(
    table: &'t [(&str, FieldSerializer)],
    signature: &str,
) -> Option<&'t FieldSerializer> {
    table
        .binary_search_by(|(sig, _)| (*sig).cmp(signature))
        .ok()
        .map(|i| &table[i].1)
}

/// Runtime-populated [`TypeSerializer`], for hand-written dispatch and tests.
#[derive(Debug, Clone, Default)]
pub struct SerializerTable {
    entries: BTreeMap<String, FieldSerializer>,
}

impl SerializerTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the entry for `signature`.
    pub fn register(&mut self, signature: impl Into<String>, entry: FieldSerializer) -> &mut Self {
        self.entries.insert(signature.into(), entry);
        self
    }

    /// Number of registered signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TypeSerializer for SerializerTable {
    fn serializer(&self, signature: &str) -> Option<&FieldSerializer> {
        self.entries.get(signature)
    }
}

/// Wrap a value as a shared object.
pub fn new_object<T: WireObject>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Identity comparison (ignores vtable pointers).
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Check that `object` carries one of the `accepted` signatures, the ones
/// that may stand in for `expected`.
pub fn expect_signature(
    object: &ObjectRef,
    expected: &str,
    accepted: &[&str],
) -> Result<(), SerializationError> {
    let found = object
        .try_borrow()
        .map_err(|_| SerializationError::ObjectInUse(expected.to_owned()))?
        .type_signature();
    if accepted.contains(&found) {
        Ok(())
    } else {
        Err(SerializationError::TypeMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
    }
}

/// Downcast a borrowed object, failing with [`SerializationError::TypeMismatch`].
pub fn downcast_ref<'o, T: WireObject>(
    object: &'o dyn WireObject,
    expected: &str,
) -> Result<&'o T, SerializationError> {
    let found = object.type_signature();
    object
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| SerializationError::TypeMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
}

/// Mutable variant of [`downcast_ref`].
pub fn downcast_mut<'o, T: WireObject>(
    object: &'o mut dyn WireObject,
    expected: &str,
) -> Result<&'o mut T, SerializationError> {
    let found = object.type_signature();
    object
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| SerializationError::TypeMismatch {
            expected: expected.to_owned(),
            found: found.to_owned(),
        })
}

/// Borrow a shared object as `T`, or `None` if it holds another type.
///
/// Panics like [`RefCell::borrow`] if the object is mutably borrowed.
pub fn borrow_as<T: WireObject>(object: &ObjectRef) -> Option<Ref<'_, T>> {
    Ref::filter_map(object.borrow(), |o| o.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow a shared object as `T`, or `None` if it holds another type.
///
/// Panics like [`RefCell::borrow_mut`] if the object is already borrowed.
pub fn borrow_as_mut<T: WireObject>(object: &ObjectRef) -> Option<RefMut<'_, T>> {
    RefMut::filter_map(object.borrow_mut(), |o| o.as_any_mut().downcast_mut::<T>()).ok()
}
