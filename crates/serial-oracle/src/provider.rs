// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The host type-system port.
//!
//! Closure computation never inspects source code directly; it asks a
//! [`TypeInfoProvider`] for declarations. [`Schema`](crate::Schema) is the
//! JSON-backed implementation, but any ahead-of-time model works.

use serde::{Deserialize, Serialize};

use crate::type_ref::TypeRef;

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// A class (possibly abstract).
    Class,
    /// An enumeration; instantiated from its ordinal.
    Enum,
    /// An interface; never instantiated, never carries fields.
    Interface,
}

/// How a field is reached from generated code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAccess {
    /// Directly accessible field.
    #[default]
    Field,
    /// Public getter/setter pair.
    Property,
    /// Not accessible; skipped by structural serialization.
    Private,
}

/// One instance field of a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name as declared.
    pub name: String,
    /// Declared type.
    pub ty: TypeRef,
    /// Accessor shape.
    pub access: FieldAccess,
    /// Transient fields are never serialized.
    pub transient: bool,
}

impl FieldInfo {
    /// Whether structural serialization reads and writes this field.
    pub fn is_eligible(&self) -> bool {
        !self.transient && self.access != FieldAccess::Private
    }
}

/// A hand-written companion replacing structural field expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSerializer {
    /// Path of the companion (module or type) exposing `serialize`,
    /// `deserialize` and optionally `instantiate`.
    pub path: String,
    /// Path of the Rust type the companion operates on.
    pub rust_type: String,
    /// Whether the companion provides `instantiate`.
    pub instantiate: bool,
    /// Types the companion writes or reads itself; treated as satisfied
    /// roots of the closure.
    pub requires: Vec<TypeRef>,
}

/// Everything the oracle needs to know about one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Fully-qualified name.
    pub name: String,
    /// Class, enum, or interface.
    pub kind: DeclKind,
    /// Abstract classes are never instantiated directly.
    pub is_abstract: bool,
    /// Whether a no-argument constructor exists.
    pub default_constructor: bool,
    /// Declared superclass, generics erased.
    pub superclass: Option<String>,
    /// Implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<String>,
    /// Instance fields in declaration order.
    pub fields: Vec<FieldInfo>,
    /// Enum constants in ordinal order.
    pub values: Vec<String>,
    /// Custom serializer, if the type opts out of structural handling.
    pub custom_serializer: Option<CustomSerializer>,
}

impl TypeDecl {
    /// Whether a reader can create an instance of exactly this type.
    pub fn is_instantiable(&self) -> bool {
        match self.kind {
            DeclKind::Enum => true,
            DeclKind::Interface => false,
            DeclKind::Class => {
                self.custom_serializer.as_ref().is_some_and(|c| c.instantiate)
                    || (!self.is_abstract && self.default_constructor)
            }
        }
    }

    /// Fields structural serialization walks, in declaration order.
    pub fn eligible_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_eligible())
    }
}

/// Capability the closure algorithm needs from the host type system.
pub trait TypeInfoProvider {
    /// Look up a declaration by fully-qualified name.
    fn declaration(&self, name: &str) -> Option<&TypeDecl>;

    /// Every declaration this provider knows, sorted by name.
    fn declared_names(&self) -> Vec<&str>;

    /// Instance fields of `name` (empty when unknown).
    fn fields(&self, name: &str) -> &[FieldInfo] {
        self.declaration(name).map_or(&[], |d| d.fields.as_slice())
    }

    /// Superclass of `name`, if declared.
    fn superclass(&self, name: &str) -> Option<&str> {
        self.declaration(name).and_then(|d| d.superclass.as_deref())
    }

    /// Interfaces implemented by `name`.
    fn interfaces(&self, name: &str) -> &[String] {
        self.declaration(name).map_or(&[], |d| d.interfaces.as_slice())
    }

    /// Whether `name` has a no-argument constructor.
    fn has_default_constructor(&self, name: &str) -> bool {
        self.declaration(name).is_some_and(|d| d.default_constructor)
    }

    /// Whether `name` is abstract (interfaces count as abstract).
    fn is_abstract(&self, name: &str) -> bool {
        self.declaration(name)
            .is_some_and(|d| d.is_abstract || d.kind == DeclKind::Interface)
    }

    /// Custom serializer registered for `name`.
    fn custom_serializer(&self, name: &str) -> Option<&CustomSerializer> {
        self.declaration(name).and_then(|d| d.custom_serializer.as_ref())
    }

    /// Whether a reader can create an instance of exactly `name`.
    fn is_instantiable(&self, name: &str) -> bool {
        self.declaration(name).is_some_and(TypeDecl::is_instantiable)
    }
}
