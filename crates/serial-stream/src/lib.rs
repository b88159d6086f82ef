// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! WireStream: the runtime binary format carrying object graphs between two
//! independently compiled endpoints.
//!
//! A payload is a 4-byte header (`u16` LE version, `u16` LE flags) followed
//! by a token sequence:
//!
//! - scalars are fixed-width little endian (`char` as a `u32` scalar value);
//! - strings go through a positional string table: a `u32` ordinal, where
//!   `0` is null, the next unused ordinal introduces a new entry (`u32`
//!   length + UTF-8 bytes), and any smaller ordinal refers back;
//! - objects go through an identity object table with the same ordinal
//!   scheme; a new object is followed by its type signature (a string token)
//!   and then whatever its [`FieldSerializer`] writes.
//!
//! Dispatch from signature to `{serialize, deserialize, instantiate}` goes
//! through a [`TypeSerializer`], normally a sorted static table emitted by
//! `serial-gen`.
//!
//! Both sides cap how many new objects may be nested inside each other's
//! fields at [`MAX_OBJECT_DEPTH`], so a writer never produces a payload its
//! peer refuses for depth, and neither side can exhaust its stack.
//!
//! A [`Writer`] or [`Reader`] belongs to one message. Object graphs are
//! `Rc<RefCell<_>>` and never cross threads.

mod error;
mod object;
mod reader;
mod writer;

pub use error::SerializationError;
pub use object::{
    borrow_as, borrow_as_mut, downcast_mut, downcast_ref, expect_signature, lookup_sorted,
    new_object, same_object, DeserializeFn, FieldSerializer, InstantiateFn, ObjectRef,
    SerializeFn, SerializerTable, TypeSerializer, WireObject,
};
pub use reader::Reader;
pub use writer::Writer;

/// Wire format version written in every header.
pub const WIRE_VERSION: u16 = 1;

/// Header length in bytes.
pub const HEADER_LEN: usize = 4;

/// Default nesting limit for new objects written or read inside other
/// objects' fields. Back-references do not count. Sized to fit a default
/// 2 MiB thread stack in unoptimized builds; raise it with
/// `with_max_depth` on both ends when running on a larger stack.
pub const MAX_OBJECT_DEPTH: usize = 128;
