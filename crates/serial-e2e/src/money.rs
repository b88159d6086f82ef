// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hand-written value type with a custom serializer.
//!
//! `demo.Money` has no default constructor, so readers create it through
//! [`money_serializer::instantiate`], which consumes the currency. The
//! amount follows as the only field.

use std::any::Any;

use serial_stream::WireObject;

/// An amount in minor units of one currency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Money {
    /// ISO 4217 code.
    pub currency: String,
    /// Amount in cents.
    pub cents: i64,
}

impl WireObject for Money {
    fn type_signature(&self) -> &'static str {
        "demo.Money"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Companion functions called by the generated `demo.Money` serializer.
pub mod money_serializer {
    use serial_stream::{Reader, SerializationError, Writer};

    use super::Money;

    /// Currency, then cents.
    pub fn serialize(writer: &mut Writer<'_>, value: &Money) -> Result<(), SerializationError> {
        writer.write_string(&value.currency)?;
        writer.write_long(value.cents);
        Ok(())
    }

    /// Reads the currency; the amount is filled in by [`deserialize`].
    pub fn instantiate(reader: &mut Reader<'_>) -> Result<Money, SerializationError> {
        Ok(Money {
            currency: reader.read_string()?,
            cents: 0,
        })
    }

    /// Reads the amount.
    pub fn deserialize(reader: &mut Reader<'_>, value: &mut Money) -> Result<(), SerializationError> {
        value.cents = reader
            .read_long()
            .map_err(|e| e.in_field("demo.Money", "cents"))?;
        Ok(())
    }
}
