// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable type oracle.
//!
//! Given the root types that appear in endpoint signatures and the set of
//! concrete types known across incremental builds, `serial-oracle` computes
//! the closure of types that must be transmissible in each direction:
//!
//! - [`SubtypeRegistry`] persists known class/enum names (`knownTypes.txt`)
//!   and derives a [`SubtypeIndex`] (supertype → direct subtypes).
//! - [`TypeOracleBuilder`] runs the fixed-point reachability for one
//!   [`Direction`] and yields a [`SerializableTypeOracle`].
//! - [`SerializableTypeOracleUnion`] merges a read and a write oracle into a
//!   per-type [`Classification`] used to decide which operations to emit.
//! - [`FieldSerializerModel`] describes how a single declared type is walked
//!   field by field (or delegated to a custom serializer).
//!
//! The algorithm only talks to the host type system through
//! [`TypeInfoProvider`]; [`Schema`] is the JSON-backed provider used by
//! `serial-gen`.
//!
//! # Determinism
//!
//! Closure membership is a set fixed point and does not depend on queue
//! order. Every enumeration exposed here iterates in [`TypeRef`] order, so
//! repeated runs over the same inputs produce identical output.

mod builder;
mod error;
mod model;
mod oracle;
mod provider;
mod registry;
mod schema;
mod type_ref;
mod union;

pub use builder::{BuilderOptions, Direction, OracleBuild, RootProblem, TypeOracleBuilder};
pub use error::{OracleError, RegistryError};
pub use model::FieldSerializerModel;
pub use oracle::{FactKind, SerializableTypeOracle, TypeFacts};
pub use provider::{CustomSerializer, DeclKind, FieldAccess, FieldInfo, TypeDecl, TypeInfoProvider};
pub use registry::{SubtypeIndex, SubtypeRegistry, KNOWN_TYPES_FILENAME};
pub use schema::{
    CustomSerializerDef, EndpointDef, FieldDef, MethodDef, ParamDef, Schema, SchemaDocument,
    SchemaLoadError, TypeDef, SCHEMA_VERSION,
};
pub use type_ref::{Primitive, TypeRef};
pub use union::{Classification, SerializableTypeOracleUnion};
