// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-type decision of which operations to emit.

use std::collections::{BTreeMap, BTreeSet};

use serial_oracle::{
    Classification, DeclKind, FieldSerializerModel, OracleError, SerializableTypeOracleUnion,
    TypeInfoProvider, TypeRef,
};
use thiserror::Error;

use crate::naming::{self, NamingError};

/// Errors raised while planning emission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The declaration backing a closure member could not be modeled.
    #[error(transparent)]
    Model(#[from] OracleError),

    /// A name cannot be turned into an identifier.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// Two declared types map to the same generated identifier.
    #[error("`{first}` and `{second}` both generate `{ident}`")]
    NameCollision {
        /// Generated identifier.
        ident: String,
        /// First declared type.
        first: String,
        /// Second declared type.
        second: String,
    },
}

/// Operations emitted for one type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operations {
    /// Emit the field writer.
    pub serialize: bool,
    /// Emit the field reader.
    pub deserialize: bool,
    /// Emit the instance factory.
    pub instantiate: bool,
}

/// What kind of code a planned type produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanKind {
    /// Struct (or custom companion forwarding) with field routines.
    Class(FieldSerializerModel),
    /// Enum sent by ordinal.
    Enum(FieldSerializerModel),
    /// Inline array helpers.
    Array {
        /// Non-array element type.
        leaf: TypeRef,
        /// Dimensions.
        rank: u8,
    },
}

/// Emission plan for one closure member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePlan {
    /// The type.
    pub ty: TypeRef,
    /// Direction classification from the union.
    pub classification: Classification,
    /// Operations to emit.
    pub ops: Operations,
    /// Shape of the emitted code.
    pub kind: PlanKind,
    /// Declared types a value of this type can stand in for: itself, its
    /// superclasses, and every interface they implement. Empty for arrays.
    pub supertypes: BTreeSet<String>,
}

impl TypePlan {
    /// The field model for classes and enums.
    pub fn model(&self) -> Option<&FieldSerializerModel> {
        match &self.kind {
            PlanKind::Class(m) | PlanKind::Enum(m) => Some(m),
            PlanKind::Array { .. } => None,
        }
    }

    /// Whether this type has an entry in the signature dispatch table.
    pub fn is_dispatched(&self) -> bool {
        !matches!(self.kind, PlanKind::Array { .. })
    }
}

/// Emission plan for a whole endpoint, in stable type order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSerializerPlan {
    types: Vec<TypePlan>,
}

impl FieldSerializerPlan {
    /// Plan every class, enum, and array in the union. Primitives need no
    /// code; interfaces are never a runtime signature.
    pub fn build(
        provider: &dyn TypeInfoProvider,
        union: &SerializableTypeOracleUnion,
    ) -> Result<Self, PlanError> {
        let mut types = Vec::new();
        let mut idents: BTreeMap<String, String> = BTreeMap::new();
        for ty in union.serializable_types() {
            let Some(classification) = union.classify(&ty) else {
                continue;
            };
            let kind = match &ty {
                TypeRef::Primitive(_) => continue,
                TypeRef::Array { leaf, rank } => PlanKind::Array {
                    leaf: (**leaf).clone(),
                    rank: *rank,
                },
                TypeRef::Declared(name) => {
                    let model = FieldSerializerModel::create(provider, union, name)?;
                    match model.kind {
                        DeclKind::Interface => continue,
                        DeclKind::Enum => PlanKind::Enum(model),
                        DeclKind::Class => PlanKind::Class(model),
                    }
                }
            };
            if let Some(model) = match &kind {
                PlanKind::Class(m) | PlanKind::Enum(m) => Some(m),
                PlanKind::Array { .. } => None,
            } {
                let ident = naming::type_ident(&model.name)?.to_string();
                if let Some(first) = idents.insert(ident.clone(), model.name.clone()) {
                    return Err(PlanError::NameCollision {
                        ident,
                        first,
                        second: model.name.clone(),
                    });
                }
            }
            let ops = operations(&kind, classification);
            let supertypes = ty
                .declared_name()
                .map(|name| supertypes(provider, name))
                .unwrap_or_default();
            types.push(TypePlan {
                ty,
                classification,
                ops,
                kind,
                supertypes,
            });
        }
        Ok(Self { types })
    }

    /// Planned types in stable order.
    pub fn types(&self) -> &[TypePlan] {
        &self.types
    }

    /// Plan for one type.
    pub fn get(&self, ty: &TypeRef) -> Option<&TypePlan> {
        self.types.iter().find(|p| &p.ty == ty)
    }

    /// Plan for a declared type by name.
    pub fn declared(&self, name: &str) -> Option<&TypePlan> {
        self.types
            .iter()
            .find(|p| p.ty.declared_name() == Some(name))
    }

    /// Signatures this endpoint can write where a `target` is expected.
    pub fn writable_as(&self, target: &str) -> Vec<&str> {
        self.types
            .iter()
            .filter(|p| p.is_dispatched() && p.ops.serialize && p.supertypes.contains(target))
            .filter_map(|p| p.ty.declared_name())
            .collect()
    }
}

fn supertypes(provider: &dyn TypeInfoProvider, name: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut pending = vec![name.to_owned()];
    while let Some(current) = pending.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(sup) = provider.superclass(&current) {
            pending.push(sup.to_owned());
        }
        pending.extend(provider.interfaces(&current).iter().cloned());
    }
    seen
}

fn operations(kind: &PlanKind, c: Classification) -> Operations {
    match kind {
        PlanKind::Class(_) => Operations {
            serialize: c.writes(),
            deserialize: c.reads(),
            instantiate: c.instantiates(),
        },
        // An enum value carries nothing beyond its ordinal, which
        // instantiate consumes. Deserialize is a no-op for readers.
        PlanKind::Enum(_) => Operations {
            serialize: c.writes(),
            deserialize: c.reads(),
            instantiate: c.reads(),
        },
        PlanKind::Array { .. } => Operations {
            serialize: c.writes(),
            deserialize: c.reads(),
            instantiate: false,
        },
    }
}
