// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Build-time error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving types or computing a closure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// A root or field type is neither primitive, array, nor a known declaration.
    #[error("unresolvable type `{name}`")]
    UnresolvableType {
        /// Name as it appeared in the signature or field.
        name: String,
    },

    /// A concrete type must be instantiated but has no default constructor and
    /// no custom instantiator.
    #[error("`{name}` must be instantiated but has no default constructor or custom instantiator")]
    NotInstantiable {
        /// Fully-qualified type name.
        name: String,
    },

    /// An abstract type is referenced but no known subtype can be instantiated.
    #[error("closure for `{name}` is incomplete: no known instantiable subtype")]
    IncompleteClosure {
        /// Fully-qualified type name.
        name: String,
    },

    /// A type name could not be parsed.
    #[error("malformed type name `{name}`: {reason}")]
    BadTypeName {
        /// Offending text.
        name: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The same declaration appears twice in a schema.
    #[error("type `{name}` is declared more than once")]
    DuplicateType {
        /// Fully-qualified type name.
        name: String,
    },

    /// A closure failed for a particular root.
    #[error("root `{root}`: {source}")]
    Root {
        /// Root type, rendered.
        root: String,
        /// Underlying failure.
        #[source]
        source: Box<OracleError>,
    },
}

/// Errors raised while loading or persisting the known-type registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading the registry file failed.
    #[error("failed to read known types from {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// Writing the registry file failed.
    #[error("failed to write known types to {path}: {source}")]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },
}
