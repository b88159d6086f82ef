// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Append-only stream writer.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::SerializationError;
use crate::object::{ObjectRef, TypeSerializer};
use crate::{MAX_OBJECT_DEPTH, WIRE_VERSION};

/// Encodes one outgoing message.
///
/// Strings are deduplicated by value and objects by identity; the first
/// occurrence of each gets the next ordinal.
pub struct Writer<'a> {
    serializer: &'a dyn TypeSerializer,
    buf: Vec<u8>,
    strings: FxHashMap<String, u32>,
    objects: FxHashMap<*const (), u32>,
    // Keeps every written object alive so its address cannot be reused by
    // a different object while this writer is in use.
    retained: Vec<ObjectRef>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Writer<'a> {
    /// New writer; the header is written immediately.
    pub fn new(serializer: &'a dyn TypeSerializer) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&WIRE_VERSION.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        Self {
            serializer,
            buf,
            strings: FxHashMap::default(),
            objects: FxHashMap::default(),
            retained: Vec::new(),
            depth: 0,
            max_depth: MAX_OBJECT_DEPTH,
        }
    }

    /// Replace the object nesting limit; it should match the peer reader's.
    #[must_use]
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Write a boolean as one byte (`0` or `1`).
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a signed byte.
    pub fn write_byte(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a char as its `u32` scalar value.
    pub fn write_char(&mut self, value: char) {
        self.write_u32(u32::from(value));
    }

    /// Write a little-endian `i16`.
    pub fn write_short(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i32`.
    pub fn write_int(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian `i64`.
    pub fn write_long(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an IEEE 754 binary32, little endian.
    pub fn write_float(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an IEEE 754 binary64, little endian.
    pub fn write_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a non-null string through the string table.
    pub fn write_string(&mut self, value: &str) -> Result<(), SerializationError> {
        if let Some(&ordinal) = self.strings.get(value) {
            self.write_u32(ordinal);
            return Ok(());
        }
        let ordinal = next_ordinal(self.strings.len())?;
        let len = u32::try_from(value.len())
            .map_err(|_| SerializationError::LengthTooLarge(value.len()))?;
        self.strings.insert(value.to_owned(), ordinal);
        self.write_u32(ordinal);
        self.write_u32(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Write a nullable string; `None` is ordinal `0`.
    pub fn write_opt_string(&mut self, value: Option<&str>) -> Result<(), SerializationError> {
        match value {
            Some(value) => self.write_string(value),
            None => {
                self.write_u32(0);
                Ok(())
            }
        }
    }

    /// Write a nullable object reference through the object table.
    ///
    /// A new object gets its ordinal before its fields are written, so a
    /// field that points back at it (directly or through a cycle) becomes a
    /// back-reference. Fails with [`SerializationError::NestingTooDeep`]
    /// rather than emit more nested new objects than the peer will read.
    pub fn write_object(&mut self, object: Option<&ObjectRef>) -> Result<(), SerializationError> {
        let Some(object) = object else {
            self.write_u32(0);
            return Ok(());
        };
        let key = Rc::as_ptr(object).cast::<()>();
        if let Some(&ordinal) = self.objects.get(&key) {
            self.write_u32(ordinal);
            return Ok(());
        }
        if self.depth >= self.max_depth {
            return Err(SerializationError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        let ordinal = next_ordinal(self.objects.len())?;
        self.objects.insert(key, ordinal);
        self.retained.push(Rc::clone(object));
        self.write_u32(ordinal);

        self.depth += 1;
        let result = self.write_new_object(object);
        self.depth -= 1;
        result
    }

    fn write_new_object(&mut self, object: &ObjectRef) -> Result<(), SerializationError> {
        let guard = object.try_borrow().map_err(|_| {
            SerializationError::ObjectInUse(String::from("<mutably borrowed object>"))
        })?;
        let signature = guard.type_signature();
        self.write_string(signature)?;
        let serialize = self
            .serializer
            .serializer(signature)
            .ok_or_else(|| SerializationError::UnknownTypeSignature(signature.to_owned()))?
            .serialize
            .ok_or_else(|| SerializationError::UnsupportedOperation {
                signature: signature.to_owned(),
                operation: "serialize",
            })?;
        serialize(self, &*guard)
    }

    /// Write an array or collection length as an `int`.
    pub fn write_length(&mut self, len: usize) -> Result<(), SerializationError> {
        let value = i32::try_from(len).map_err(|_| SerializationError::LengthTooLarge(len))?;
        self.write_int(value);
        Ok(())
    }

    /// Entries in the string table so far.
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Entries in the object table so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// A copy of the encoded bytes, header included.
    pub fn payload(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.buf
    }

    fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn next_ordinal(len: usize) -> Result<u32, SerializationError> {
    len.checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(SerializationError::LengthTooLarge(len))
}
