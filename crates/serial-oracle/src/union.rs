// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read/write oracle merge and per-type direction classification.

use std::collections::BTreeSet;

use crate::builder::Direction;
use crate::oracle::SerializableTypeOracle;
use crate::type_ref::TypeRef;

/// Which operations a type needs, given the directions it travels in.
///
/// The classification only trims emitted code. Decoding correctness never
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Only ever written.
    WriteOnly,
    /// Only ever read, and instantiable by the reader.
    ReadOnlyInstantiate,
    /// Only ever read, and only as the superclass part of a subtype.
    ReadOnlySuperclass,
    /// Written and read, instantiable by the reader.
    Both,
    /// Written, but read only as the superclass part of a subtype.
    BothReadSuperclass,
}

impl Classification {
    /// Pure classification from membership and instantiability.
    ///
    /// Returns `None` when the type is in neither oracle.
    pub fn classify(in_read: bool, in_write: bool, instantiable: bool) -> Option<Self> {
        match (in_read, in_write, instantiable) {
            (false, false, _) => None,
            (false, true, _) => Some(Self::WriteOnly),
            (true, false, true) => Some(Self::ReadOnlyInstantiate),
            (true, false, false) => Some(Self::ReadOnlySuperclass),
            (true, true, true) => Some(Self::Both),
            (true, true, false) => Some(Self::BothReadSuperclass),
        }
    }

    /// A serialize routine is needed.
    pub fn writes(self) -> bool {
        matches!(self, Self::WriteOnly | Self::Both | Self::BothReadSuperclass)
    }

    /// A deserialize routine is needed.
    pub fn reads(self) -> bool {
        !matches!(self, Self::WriteOnly)
    }

    /// An instantiate routine is needed.
    pub fn instantiates(self) -> bool {
        matches!(self, Self::ReadOnlyInstantiate | Self::Both)
    }

    /// Stable variant label, used in generated doc comments and CLI output.
    pub fn variant_name(self) -> &'static str {
        match self {
            Self::WriteOnly => "WriteOnly",
            Self::ReadOnlyInstantiate => "ReadOnlyInstantiate",
            Self::ReadOnlySuperclass => "ReadOnlySuperclass",
            Self::Both => "WriteInstantiateReadInstantiate",
            Self::BothReadSuperclass => "WriteInstantiateReadSuperclass",
        }
    }
}

/// Read-only view over a read oracle and a write oracle.
#[derive(Debug, Clone)]
pub struct SerializableTypeOracleUnion {
    read: SerializableTypeOracle,
    write: SerializableTypeOracle,
}

impl SerializableTypeOracleUnion {
    /// Combine two oracles. Arguments are taken in (read, write) order
    /// regardless of the directions recorded inside them.
    pub fn new(read: SerializableTypeOracle, write: SerializableTypeOracle) -> Self {
        debug_assert_eq!(read.direction(), Direction::Read);
        debug_assert_eq!(write.direction(), Direction::Write);
        Self { read, write }
    }

    /// The read-direction oracle.
    pub fn read(&self) -> &SerializableTypeOracle {
        &self.read
    }

    /// The write-direction oracle.
    pub fn write(&self) -> &SerializableTypeOracle {
        &self.write
    }

    /// Classification for `ty`, or `None` if neither side contains it.
    pub fn classify(&self, ty: &TypeRef) -> Option<Classification> {
        let in_read = self.read.is_serializable(ty);
        let in_write = self.write.is_serializable(ty);
        let instantiable = self
            .read
            .facts(ty)
            .or_else(|| self.write.facts(ty))
            .is_some_and(|f| f.instantiable);
        Classification::classify(in_read, in_write, instantiable)
    }

    /// Whether either side contains `ty`.
    pub fn is_serializable(&self, ty: &TypeRef) -> bool {
        self.read.is_serializable(ty) || self.write.is_serializable(ty)
    }

    /// The union of both closures in stable order.
    pub fn serializable_types(&self) -> Vec<TypeRef> {
        let all: BTreeSet<&TypeRef> = self.read.types().chain(self.write.types()).collect();
        all.into_iter().cloned().collect()
    }
}
