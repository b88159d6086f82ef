// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-type description of how structural serialization walks a type.

use crate::error::OracleError;
use crate::provider::{CustomSerializer, DeclKind, FieldInfo, TypeInfoProvider};
use crate::type_ref::TypeRef;
use crate::union::SerializableTypeOracleUnion;

/// Field-level model of one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSerializerModel {
    /// Fully-qualified name.
    pub name: String,
    /// Class, enum, or interface.
    pub kind: DeclKind,
    /// Abstract classes and interfaces.
    pub is_abstract: bool,
    /// A no-argument constructor exists.
    pub default_constructor: bool,
    /// A reader can create an instance of exactly this type.
    pub instantiable: bool,
    /// Every declared field in declaration order (emitted as struct fields).
    pub declared_fields: Vec<FieldInfo>,
    /// Fields walked by serialize/deserialize, in declaration order. Empty
    /// when a custom serializer is present.
    pub fields: Vec<FieldInfo>,
    /// Companion replacing structural handling.
    pub custom_serializer: Option<CustomSerializer>,
    /// Superclass whose generated routines are chained, present only when
    /// the superclass is itself serializable.
    pub superclass: Option<String>,
    /// Enum constants in ordinal order.
    pub enum_values: Vec<String>,
}

impl FieldSerializerModel {
    /// Describe `name` in the context of a computed union.
    pub fn create(
        provider: &dyn TypeInfoProvider,
        union: &SerializableTypeOracleUnion,
        name: &str,
    ) -> Result<Self, OracleError> {
        let decl = provider
            .declaration(name)
            .ok_or_else(|| OracleError::UnresolvableType {
                name: name.to_owned(),
            })?;
        let superclass = decl
            .superclass
            .as_ref()
            .filter(|sup| union.is_serializable(&TypeRef::declared(sup.as_str())))
            .cloned();
        let fields = if decl.custom_serializer.is_some() {
            Vec::new()
        } else {
            decl.eligible_fields().cloned().collect()
        };
        Ok(Self {
            name: decl.name.clone(),
            kind: decl.kind,
            is_abstract: decl.is_abstract || decl.kind == DeclKind::Interface,
            default_constructor: decl.default_constructor,
            instantiable: decl.is_instantiable(),
            declared_fields: decl.fields.clone(),
            fields,
            custom_serializer: decl.custom_serializer.clone(),
            superclass,
            enum_values: decl.values.clone(),
        })
    }

    /// Whether the type is an enum.
    pub fn is_enum(&self) -> bool {
        self.kind == DeclKind::Enum
    }

    /// Whether the type is serialized by a custom companion.
    pub fn is_custom(&self) -> bool {
        self.custom_serializer.is_some()
    }
}
