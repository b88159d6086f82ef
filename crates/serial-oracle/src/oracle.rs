// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The computed closure for one direction.

use std::collections::BTreeMap;

use crate::builder::Direction;
use crate::type_ref::TypeRef;

/// Coarse kind recorded for each member of a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactKind {
    /// Primitive or string.
    Primitive,
    /// Array of any rank.
    Array,
    /// Declared class (possibly abstract).
    Class,
    /// Declared enum.
    Enum,
    /// Declared interface.
    Interface,
}

/// What the oracle records about one member of the closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeFacts {
    /// Kind of the member.
    pub kind: FactKind,
    /// A reader can create an instance of exactly this type.
    pub instantiable: bool,
    /// Serialized by a custom companion instead of structurally.
    pub custom: bool,
}

/// Immutable result of closing a set of roots in one [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializableTypeOracle {
    direction: Direction,
    types: BTreeMap<TypeRef, TypeFacts>,
}

impl SerializableTypeOracle {
    pub(crate) fn new(direction: Direction, types: BTreeMap<TypeRef, TypeFacts>) -> Self {
        Self { direction, types }
    }

    /// Direction this oracle was computed for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Membership test.
    pub fn is_serializable(&self, ty: &TypeRef) -> bool {
        self.types.contains_key(ty)
    }

    /// Recorded facts for a member.
    pub fn facts(&self, ty: &TypeRef) -> Option<&TypeFacts> {
        self.types.get(ty)
    }

    /// Members in stable [`TypeRef`] order.
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.keys()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the closure is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
