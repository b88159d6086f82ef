// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cursor-based stream reader.

use std::rc::Rc;
use std::str;

use crate::error::SerializationError;
use crate::object::{ObjectRef, TypeSerializer};
use crate::{HEADER_LEN, MAX_OBJECT_DEPTH, WIRE_VERSION};

/// Decodes one incoming message.
pub struct Reader<'a> {
    serializer: &'a dyn TypeSerializer,
    bytes: &'a [u8],
    offset: usize,
    strings: Vec<Rc<str>>,
    // `None` marks an ordinal reserved for an object whose instantiation
    // has not finished yet.
    objects: Vec<Option<ObjectRef>>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    /// New reader with no input; call [`prepare_to_read`](Self::prepare_to_read).
    pub fn new(serializer: &'a dyn TypeSerializer) -> Self {
        Self {
            serializer,
            bytes: &[],
            offset: 0,
            strings: Vec::new(),
            objects: Vec::new(),
            depth: 0,
            max_depth: MAX_OBJECT_DEPTH,
        }
    }

    /// Replace the object nesting limit; it should match the peer writer's.
    #[must_use]
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Reader over `bytes`, header already checked.
    pub fn from_payload(
        serializer: &'a dyn TypeSerializer,
        bytes: &'a [u8],
    ) -> Result<Self, SerializationError> {
        let mut reader = Self::new(serializer);
        reader.prepare_to_read(bytes)?;
        Ok(reader)
    }

    /// Reset the tables and validate the header of `bytes`.
    pub fn prepare_to_read(&mut self, bytes: &'a [u8]) -> Result<(), SerializationError> {
        self.bytes = bytes;
        self.offset = 0;
        self.strings.clear();
        self.objects.clear();
        self.depth = 0;
        if bytes.len() < HEADER_LEN {
            return Err(SerializationError::malformed(format!(
                "missing header: {} of {HEADER_LEN} bytes",
                bytes.len()
            )));
        }
        let version = self.read_u16()?;
        if version != WIRE_VERSION {
            return Err(SerializationError::malformed(format!(
                "unsupported wire version {version}"
            )));
        }
        let flags = self.read_u16()?;
        if flags != 0 {
            return Err(SerializationError::malformed(format!(
                "unknown header flags {flags:#06x}"
            )));
        }
        Ok(())
    }

    /// Read a boolean; only `0` and `1` are valid.
    pub fn read_bool(&mut self) -> Result<bool, SerializationError> {
        match self.take_array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerializationError::malformed(format!(
                "invalid boolean byte {other}"
            ))),
        }
    }

    /// Read a signed byte.
    pub fn read_byte(&mut self) -> Result<i8, SerializationError> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    /// Read a char encoded as a `u32` scalar value.
    pub fn read_char(&mut self) -> Result<char, SerializationError> {
        let raw = self.read_u32()?;
        char::from_u32(raw).ok_or_else(|| {
            SerializationError::malformed(format!("invalid char scalar {raw:#x}"))
        })
    }

    /// Read a little-endian `i16`.
    pub fn read_short(&mut self) -> Result<i16, SerializationError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian `i32`.
    pub fn read_int(&mut self) -> Result<i32, SerializationError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian `i64`.
    pub fn read_long(&mut self) -> Result<i64, SerializationError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Read an IEEE 754 binary32.
    pub fn read_float(&mut self) -> Result<f32, SerializationError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read an IEEE 754 binary64.
    pub fn read_double(&mut self) -> Result<f64, SerializationError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Read a non-null string.
    pub fn read_string(&mut self) -> Result<String, SerializationError> {
        self.read_opt_string()?
            .ok_or_else(|| SerializationError::malformed("null where a string is required"))
    }

    /// Read a nullable string.
    pub fn read_opt_string(&mut self) -> Result<Option<String>, SerializationError> {
        Ok(self.read_string_entry()?.map(|s| s.to_string()))
    }

    /// Read a nullable object reference.
    ///
    /// A new object's ordinal is reserved before its signature is read, the
    /// instance is stored before its fields are read, and fields that point
    /// back at it resolve to that same instance.
    pub fn read_object(&mut self) -> Result<Option<ObjectRef>, SerializationError> {
        let ordinal = self.read_u32()?;
        if ordinal == 0 {
            return Ok(None);
        }
        let known = self.objects.len();
        let index = ordinal as usize - 1;
        if index < known {
            return match &self.objects[index] {
                Some(object) => Ok(Some(Rc::clone(object))),
                None => Err(SerializationError::malformed(format!(
                    "back-reference to object {ordinal} before it was instantiated"
                ))),
            };
        }
        if index > known {
            return Err(SerializationError::BadObjectOrdinal { ordinal, known });
        }
        if self.depth >= self.max_depth {
            return Err(SerializationError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.objects.push(None);
        self.depth += 1;
        let result = self.read_new_object(index);
        self.depth -= 1;
        result.map(Some)
    }

    /// Read an array or collection length written by
    /// [`Writer::write_length`](crate::Writer::write_length), claiming one
    /// byte per element.
    pub fn read_length(&mut self) -> Result<usize, SerializationError> {
        let raw = self.read_int()?;
        let len = usize::try_from(raw)
            .map_err(|_| SerializationError::malformed(format!("negative length {raw}")))?;
        self.claim_items(len)?;
        Ok(len)
    }

    /// Fail fast when `count` items cannot possibly fit in what remains.
    /// Every item occupies at least one byte.
    pub fn claim_items(&self, count: usize) -> Result<(), SerializationError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(SerializationError::TruncatedBuffer {
                needed: count,
                remaining,
            });
        }
        Ok(())
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Check the whole payload was consumed.
    pub fn finish(&self) -> Result<(), SerializationError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SerializationError::malformed(format!("{n} trailing bytes"))),
        }
    }

    fn read_new_object(&mut self, index: usize) -> Result<ObjectRef, SerializationError> {
        let signature = self
            .read_string_entry()?
            .ok_or_else(|| SerializationError::malformed("null type signature"))?;
        let entry = *self
            .serializer
            .serializer(&signature)
            .ok_or_else(|| SerializationError::UnknownTypeSignature(signature.to_string()))?;
        let instantiate = entry
            .instantiate
            .ok_or_else(|| SerializationError::NotInstantiable(signature.to_string()))?;
        let deserialize = entry
            .deserialize
            .ok_or_else(|| SerializationError::UnsupportedOperation {
                signature: signature.to_string(),
                operation: "deserialize",
            })?;

        let object = instantiate(self)?;
        let found = object
            .try_borrow()
            .map_err(|_| SerializationError::ObjectInUse(signature.to_string()))?
            .type_signature();
        if found != &*signature {
            return Err(SerializationError::TypeMismatch {
                expected: signature.to_string(),
                found: found.to_owned(),
            });
        }
        self.objects[index] = Some(Rc::clone(&object));
        {
            let mut guard = object
                .try_borrow_mut()
                .map_err(|_| SerializationError::ObjectInUse(signature.to_string()))?;
            deserialize(self, &mut *guard)?;
        }
        Ok(object)
    }

    fn read_string_entry(&mut self) -> Result<Option<Rc<str>>, SerializationError> {
        let ordinal = self.read_u32()?;
        if ordinal == 0 {
            return Ok(None);
        }
        let known = self.strings.len();
        let index = ordinal as usize - 1;
        if index < known {
            return Ok(Some(Rc::clone(&self.strings[index])));
        }
        if index > known {
            return Err(SerializationError::BadStringOrdinal { ordinal, known });
        }
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        let text: Rc<str> = Rc::from(str::from_utf8(bytes).map_err(|_| SerializationError::InvalidUtf8)?);
        self.strings.push(Rc::clone(&text));
        Ok(Some(text))
    }

    fn read_u16(&mut self) -> Result<u16, SerializationError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, SerializationError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SerializationError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(SerializationError::TruncatedBuffer {
                needed: len,
                remaining,
            });
        }
        let out = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SerializationError> {
        let chunk = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::object::SerializerTable;
    use crate::writer::Writer;

    #[test]
    fn scalars_round_trip() {
        let table = SerializerTable::new();
        let mut w = Writer::new(&table);
        w.write_bool(false);
        w.write_byte(-7);
        w.write_char('λ');
        w.write_short(i16::MIN);
        w.write_int(-123_456);
        w.write_long(i64::MAX);
        w.write_float(1.5);
        w.write_double(-0.25);
        w.write_opt_string(Some("hi")).unwrap();
        w.write_opt_string(None).unwrap();
        let bytes = w.into_payload();

        let mut r = Reader::from_payload(&table, &bytes).unwrap();
        assert!(!r.read_bool().unwrap());
        assert_eq!(r.read_byte().unwrap(), -7);
        assert_eq!(r.read_char().unwrap(), 'λ');
        assert_eq!(r.read_short().unwrap(), i16::MIN);
        assert_eq!(r.read_int().unwrap(), -123_456);
        assert_eq!(r.read_long().unwrap(), i64::MAX);
        assert_eq!(r.read_float().unwrap().to_bits(), 1.5f32.to_bits());
        assert_eq!(r.read_double().unwrap().to_bits(), (-0.25f64).to_bits());
        assert_eq!(r.read_opt_string().unwrap().as_deref(), Some("hi"));
        assert_eq!(r.read_opt_string().unwrap(), None);
        r.finish().unwrap();
    }

    #[test]
    fn header_is_checked() {
        let table = SerializerTable::new();
        let mut r = Reader::new(&table);
        assert!(matches!(
            r.prepare_to_read(&[1, 0]),
            Err(SerializationError::MalformedStream(_))
        ));
        assert!(matches!(
            r.prepare_to_read(&[2, 0, 0, 0]),
            Err(SerializationError::MalformedStream(_))
        ));
        assert!(matches!(
            r.prepare_to_read(&[1, 0, 1, 0]),
            Err(SerializationError::MalformedStream(_))
        ));
        r.prepare_to_read(&[1, 0, 0, 0]).unwrap();
        r.finish().unwrap();
    }

    #[test]
    fn string_ordinal_out_of_range() {
        let table = SerializerTable::new();
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
        let mut r = Reader::from_payload(&table, &bytes).unwrap();
        assert_eq!(
            r.read_string().unwrap_err(),
            SerializationError::BadStringOrdinal {
                ordinal: 2,
                known: 0
            }
        );
    }

    #[test]
    fn invalid_bool_and_char() {
        let table = SerializerTable::new();
        let bytes = [1, 0, 0, 0, 2, 0x00, 0xD8, 0, 0];
        let mut r = Reader::from_payload(&table, &bytes).unwrap();
        assert!(r.read_bool().is_err());
        let mut r = Reader::from_payload(&table, &bytes).unwrap();
        r.take(1).unwrap();
        assert!(matches!(
            r.read_char(),
            Err(SerializationError::MalformedStream(_))
        ));
    }

    #[test]
    fn claim_items_rejects_oversized_counts() {
        let table = SerializerTable::new();
        let bytes = [1, 0, 0, 0, 0xFF, 0xFF, 0, 0, 9];
        let mut r = Reader::from_payload(&table, &bytes).unwrap();
        assert_eq!(
            r.read_length().unwrap_err(),
            SerializationError::TruncatedBuffer {
                needed: 0xFFFF,
                remaining: 1
            }
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let table = SerializerTable::new();
        let r = Reader::from_payload(&table, &[1, 0, 0, 0, 0]).unwrap();
        assert!(r.finish().is_err());
    }
}
