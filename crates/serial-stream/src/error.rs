// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime encode/decode failures.

use thiserror::Error;

/// Errors raised by [`Reader`](crate::Reader) and [`Writer`](crate::Writer).
///
/// A failed decode never hands a partially built graph to the caller: the
/// error propagates out of the outermost `read_*` call and the reader (with
/// its object table) is discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializationError {
    /// The bytes do not form a valid stream (bad header, invalid scalar,
    /// dangling back-reference, trailing bytes).
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// A read needed more bytes than remain.
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    TruncatedBuffer {
        /// Bytes (or minimum bytes for claimed items) required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// No field serializer is registered for a type signature.
    #[error("unknown type signature `{0}`")]
    UnknownTypeSignature(String),

    /// A string ordinal beyond the next unused one.
    #[error("bad string ordinal {ordinal} (table holds {known})")]
    BadStringOrdinal {
        /// Ordinal read from the stream.
        ordinal: u32,
        /// Entries in the table at that point.
        known: usize,
    },

    /// An object ordinal beyond the next unused one.
    #[error("bad object ordinal {ordinal} (table holds {known})")]
    BadObjectOrdinal {
        /// Ordinal read from the stream.
        ordinal: u32,
        /// Entries in the table at that point.
        known: usize,
    },

    /// The type has no instantiate operation in this endpoint.
    #[error("`{0}` cannot be instantiated")]
    NotInstantiable(String),

    /// The type's field serializer lacks the requested operation.
    #[error("`{signature}` does not support {operation}")]
    UnsupportedOperation {
        /// Type signature.
        signature: String,
        /// `"serialize"` or `"deserialize"`.
        operation: &'static str,
    },

    /// A value did not have the expected runtime type.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        /// Expected type signature.
        expected: String,
        /// Actual type signature.
        found: String,
    },

    /// A string entry was not valid UTF-8.
    #[error("invalid utf-8 in string table entry")]
    InvalidUtf8,

    /// A length does not fit the wire representation.
    #[error("length {0} too large")]
    LengthTooLarge(usize),

    /// New objects nested deeper than the configured limit.
    #[error("object nesting exceeds the limit of {limit}")]
    NestingTooDeep {
        /// Limit in force on the side that gave up.
        limit: usize,
    },

    /// An object was already mutably borrowed while being written or read.
    #[error("object of type `{0}` is already borrowed")]
    ObjectInUse(String),

    /// Context wrapper naming the type and field being processed.
    #[error("{type_name}.{field}: {source}")]
    InField {
        /// Type signature of the enclosing object.
        type_name: String,
        /// Field being read or written.
        field: String,
        /// Underlying failure.
        #[source]
        source: Box<SerializationError>,
    },
}

impl SerializationError {
    /// Wrap with the enclosing type and field.
    #[must_use]
    pub fn in_field(self, type_name: &str, field: &str) -> Self {
        Self::InField {
            type_name: type_name.to_owned(),
            field: field.to_owned(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any [`InField`](Self::InField) wrappers.
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::InField { source, .. } = current {
            current = source;
        }
        current
    }

    /// Field path from the outermost wrapper inwards, as `Type.field`.
    pub fn field_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::InField {
            type_name,
            field,
            source,
        } = current
        {
            path.push(format!("{type_name}.{field}"));
            current = source;
        }
        path
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedStream(detail.into())
    }
}
