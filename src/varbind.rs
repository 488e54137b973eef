//! Variable bindings.
//!
//! A [`VarBind`] pairs an OID with a value. It is what a get returns, what a
//! set sends and what a walk hands to its callback.

use std::fmt;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{EncodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

/// A single scalar read or written by the client.
pub type ScalarValue = VarBind;

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// The placeholder binding GET, GETNEXT and GETBULK requests carry.
    pub fn null(oid: Oid) -> Self {
        Self::new(oid, Value::Null)
    }

    /// Reject bindings that must never leave the client: an invalid OID as
    /// the name or as an OBJECT IDENTIFIER value, or one of the three
    /// exception sentinels as the value.
    pub fn check_request(&self) -> Result<()> {
        self.oid.validate()?;
        match &self.value {
            Value::ObjectIdentifier(payload) => payload.validate(),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                Err(Error::encode(EncodeErrorKind::SentinelInRequest {
                    tag: self.value.value_type().tag(),
                }))
            }
            _ => Ok(()),
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|pair| {
            self.value.encode(pair);
            pair.push_oid(&self.oid);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pair = decoder.read_sequence()?;
        let oid = pair.read_oid()?;
        let value = Value::decode(&mut pair)?;
        Ok(Self { oid, value })
    }

    /// Encode `varbinds` as the `SEQUENCE OF VarBind` inside a PDU.
    pub fn encode_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
        buf.push_sequence(|list| {
            varbinds.iter().rev().for_each(|vb| vb.encode(list));
        });
    }

    /// Decode a `SEQUENCE OF VarBind`, keeping wire order.
    pub fn decode_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
        let mut list = decoder.read_sequence()?;
        let mut varbinds = Vec::with_capacity(list.remaining() / 16 + 1);
        while !list.is_empty() {
            varbinds.push(Self::decode(&mut list)?);
        }
        Ok(varbinds)
    }
}

impl From<(Oid, Value)> for VarBind {
    fn from((oid, value): (Oid, Value)) -> Self {
        Self::new(oid, value)
    }
}

impl fmt::Display for VarBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}
