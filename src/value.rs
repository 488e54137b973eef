//! SNMP value types.
//!
//! [`Value`] is the closed set of wire-level values, one variant per kind.
//! [`ValueType`] names the kinds themselves: each has a fixed tag, a canonical
//! name and a validator.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::format::hex;
use crate::oid::Oid;
use bytes::Bytes;
use std::time::Duration;

/// The kind of an SNMP value.
///
/// ```
/// use snmp_lite::{Value, ValueType};
///
/// assert_eq!(ValueType::Counter32.tag(), 0x41);
/// assert_eq!(ValueType::Counter32.name(), "COUNTER32");
/// assert!(ValueType::Counter32.validate_value(&Value::Counter32(7)).is_ok());
/// assert!(ValueType::Counter32.validate_value(&Value::Gauge32(7)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Integer,
    BitString,
    OctetString,
    ObjectIdentifier,
    ObjectDescription,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    NsapAddress,
    Counter64,
    UInteger32,
    OpaqueFloat,
    OpaqueDouble,
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl ValueType {
    /// Every kind, in tag order within each class.
    pub const ALL: [ValueType; 20] = [
        ValueType::Boolean,
        ValueType::Integer,
        ValueType::BitString,
        ValueType::OctetString,
        ValueType::Null,
        ValueType::ObjectIdentifier,
        ValueType::ObjectDescription,
        ValueType::IpAddress,
        ValueType::Counter32,
        ValueType::Gauge32,
        ValueType::TimeTicks,
        ValueType::Opaque,
        ValueType::NsapAddress,
        ValueType::Counter64,
        ValueType::UInteger32,
        ValueType::OpaqueFloat,
        ValueType::OpaqueDouble,
        ValueType::NoSuchObject,
        ValueType::NoSuchInstance,
        ValueType::EndOfMibView,
    ];

    /// Wire tag.
    pub const fn tag(self) -> u8 {
        match self {
            ValueType::Boolean => tag::universal::BOOLEAN,
            ValueType::Integer => tag::universal::INTEGER,
            ValueType::BitString => tag::universal::BIT_STRING,
            ValueType::OctetString => tag::universal::OCTET_STRING,
            ValueType::Null => tag::universal::NULL,
            ValueType::ObjectIdentifier => tag::universal::OBJECT_IDENTIFIER,
            ValueType::ObjectDescription => tag::universal::OBJECT_DESCRIPTOR,
            ValueType::IpAddress => tag::application::IP_ADDRESS,
            ValueType::Counter32 => tag::application::COUNTER32,
            ValueType::Gauge32 => tag::application::GAUGE32,
            ValueType::TimeTicks => tag::application::TIMETICKS,
            ValueType::Opaque => tag::application::OPAQUE,
            ValueType::NsapAddress => tag::application::NSAP_ADDRESS,
            ValueType::Counter64 => tag::application::COUNTER64,
            ValueType::UInteger32 => tag::application::UINTEGER32,
            ValueType::OpaqueFloat => tag::application::OPAQUE_FLOAT,
            ValueType::OpaqueDouble => tag::application::OPAQUE_DOUBLE,
            ValueType::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            ValueType::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            ValueType::EndOfMibView => tag::context::END_OF_MIB_VIEW,
        }
    }

    /// Canonical kind name.
    pub const fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Integer => "INTEGER",
            ValueType::BitString => "BIT STRING",
            ValueType::OctetString => "OCTET STRING",
            ValueType::Null => "NULL",
            ValueType::ObjectIdentifier => "OBJECT IDENTIFIER",
            ValueType::ObjectDescription => "OBJECT DESCRIPTION",
            ValueType::IpAddress => "IP ADDRESS",
            ValueType::Counter32 => "COUNTER32",
            ValueType::Gauge32 => "GAUGE32",
            ValueType::TimeTicks => "TIMETICKS",
            ValueType::Opaque => "OPAQUE",
            ValueType::NsapAddress => "NSAP ADDRESS",
            ValueType::Counter64 => "COUNTER64",
            ValueType::UInteger32 => "UINTEGER32",
            ValueType::OpaqueFloat => "OPAQUE FLOAT",
            ValueType::OpaqueDouble => "OPAQUE DOUBLE",
            ValueType::NoSuchObject => "NO SUCH OBJECT",
            ValueType::NoSuchInstance => "NO SUCH INSTANCE",
            ValueType::EndOfMibView => "END OF MIB VIEW",
        }
    }

    /// Look up a kind by wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// True for the three exception sentinels.
    pub const fn is_sentinel(self) -> bool {
        matches!(
            self,
            ValueType::NoSuchObject | ValueType::NoSuchInstance | ValueType::EndOfMibView
        )
    }

    /// Check that `value` is of this kind.
    ///
    /// Fails with [`Error::TypeMismatch`] naming both kinds.
    pub fn validate_value(self, value: &Value) -> Result<()> {
        let actual = value.value_type();
        if actual.tag() != self.tag() {
            return Err(Error::TypeMismatch {
                expected: self.name(),
                actual: actual.name(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// SNMP value.
///
/// Represents all SNMP data types including SMIv2 types and exception values.
/// The kind of a value is fixed by its variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// BOOLEAN (one octet, any non-zero octet is true)
    Boolean(bool),

    /// INTEGER (ASN.1 primitive, signed 32-bit)
    Integer(i32),

    /// BIT STRING, carried as raw content octets
    BitString(Bytes),

    /// OCTET STRING (arbitrary bytes).
    OctetString(Bytes),

    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),

    /// ObjectDescriptor, carried as raw content octets
    ObjectDescription(Bytes),

    /// IpAddress (4 bytes, big-endian)
    IpAddress([u8; 4]),

    /// Counter32 (unsigned 32-bit, wrapping)
    Counter32(u32),

    /// Gauge32 (unsigned 32-bit, non-wrapping)
    Gauge32(u32),

    /// TimeTicks in hundredths of a second.
    ///
    /// Use [`Value::as_duration`] for a [`Duration`].
    TimeTicks(u32),

    /// Opaque (legacy, arbitrary bytes)
    Opaque(Bytes),

    /// NsapAddress (RFC 1442), raw octets
    NsapAddress(Bytes),

    /// Counter64 (unsigned 64-bit, wrapping).
    ///
    /// Not defined for SNMPv1.
    Counter64(u64),

    /// UInteger32 (RFC 1442)
    UInteger32(u32),

    /// Opaque float, 4-byte IEEE 754 big-endian payload
    OpaqueFloat(f32),

    /// Opaque double, 8-byte IEEE 754 big-endian payload
    OpaqueDouble(f64),

    /// NULL
    Null,

    /// noSuchObject exception - the agent does not implement the object.
    NoSuchObject,

    /// noSuchInstance exception - the object exists but this instance does not.
    NoSuchInstance,

    /// endOfMibView exception - nothing follows the requested OID.
    ///
    /// This is the normal termination condition for a walk.
    ///
    /// ```
    /// use snmp_lite::Value;
    ///
    /// let response = Value::EndOfMibView;
    /// assert!(response.is_exception());
    /// ```
    EndOfMibView,
}

impl Value {
    /// The kind of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::BitString(_) => ValueType::BitString,
            Value::OctetString(_) => ValueType::OctetString,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::ObjectDescription(_) => ValueType::ObjectDescription,
            Value::IpAddress(_) => ValueType::IpAddress,
            Value::Counter32(_) => ValueType::Counter32,
            Value::Gauge32(_) => ValueType::Gauge32,
            Value::TimeTicks(_) => ValueType::TimeTicks,
            Value::Opaque(_) => ValueType::Opaque,
            Value::NsapAddress(_) => ValueType::NsapAddress,
            Value::Counter64(_) => ValueType::Counter64,
            Value::UInteger32(_) => ValueType::UInteger32,
            Value::OpaqueFloat(_) => ValueType::OpaqueFloat,
            Value::OpaqueDouble(_) => ValueType::OpaqueDouble,
            Value::Null => ValueType::Null,
            Value::NoSuchObject => ValueType::NoSuchObject,
            Value::NoSuchInstance => ValueType::NoSuchInstance,
            Value::EndOfMibView => ValueType::EndOfMibView,
        }
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as i32.
    ///
    /// Returns `Some(i32)` for [`Value::Integer`], `None` otherwise.
    ///
    /// ```
    /// use snmp_lite::Value;
    ///
    /// assert_eq!(Value::Integer(-100).as_i32(), Some(-100));
    /// assert_eq!(Value::Counter32(42).as_i32(), None);
    /// ```
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32.
    ///
    /// Returns `Some(u32)` for the unsigned 32-bit kinds ([`Value::Counter32`],
    /// [`Value::Gauge32`], [`Value::TimeTicks`], [`Value::UInteger32`]) and for
    /// non-negative [`Value::Integer`].
    ///
    /// ```
    /// use snmp_lite::Value;
    ///
    /// assert_eq!(Value::TimeTicks(300).as_u32(), Some(300));
    /// assert_eq!(Value::Integer(50).as_u32(), Some(50));
    /// assert_eq!(Value::Integer(-1).as_u32(), None);
    /// assert_eq!(Value::Counter64(100).as_u32(), None);
    /// ```
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) | Value::UInteger32(v) => {
                Some(*v)
            }
            Value::Integer(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    /// Try to get as u64.
    ///
    /// Works for [`Value::Counter64`] and everything [`Value::as_u32`] accepts.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            other => other.as_u32().map(u64::from),
        }
    }

    /// Try to get as f32.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::OpaqueFloat(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64. Accepts both opaque float kinds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::OpaqueDouble(v) => Some(*v),
            Value::OpaqueFloat(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Try to get the raw payload of a byte-carrying kind.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(data)
            | Value::BitString(data)
            | Value::ObjectDescription(data)
            | Value::Opaque(data)
            | Value::NsapAddress(data) => Some(data),
            _ => None,
        }
    }

    /// Try to get an OCTET STRING as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(data) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    /// Try to get as an OID.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Try to get an IpAddress as [`std::net::Ipv4Addr`].
    pub fn as_ip(&self) -> Option<std::net::Ipv4Addr> {
        match self {
            Value::IpAddress(addr) => Some(std::net::Ipv4Addr::from(*addr)),
            _ => None,
        }
    }

    /// TimeTicks as a [`Duration`].
    ///
    /// ```
    /// use snmp_lite::Value;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Value::TimeTicks(150).as_duration(), Some(Duration::from_millis(1500)));
    /// assert_eq!(Value::Integer(150).as_duration(), None);
    /// ```
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::TimeTicks(v) => Some(Duration::from_millis(u64::from(*v) * 10)),
            _ => None,
        }
    }

    /// True for noSuchObject, noSuchInstance and endOfMibView.
    pub fn is_exception(&self) -> bool {
        self.value_type().is_sentinel()
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Boolean(v) => buf.push_bool(*v),
            Value::Integer(v) => buf.push_integer(*v),
            Value::BitString(data) => buf.push_primitive(tag::universal::BIT_STRING, data),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::ObjectDescription(data) => {
                buf.push_primitive(tag::universal::OBJECT_DESCRIPTOR, data)
            }
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => buf.push_primitive(tag::application::OPAQUE, data),
            Value::NsapAddress(data) => buf.push_primitive(tag::application::NSAP_ADDRESS, data),
            Value::Counter64(v) => buf.push_integer64(*v),
            Value::UInteger32(v) => buf.push_unsigned32(tag::application::UINTEGER32, *v),
            Value::OpaqueFloat(v) => {
                buf.push_primitive(tag::application::OPAQUE_FLOAT, &v.to_be_bytes())
            }
            Value::OpaqueDouble(v) => {
                buf.push_primitive(tag::application::OPAQUE_DOUBLE, &v.to_be_bytes())
            }
            Value::Null => buf.push_null(),
            Value::NoSuchObject => buf.push_null_with_tag(tag::context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => buf.push_null_with_tag(tag::context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => buf.push_null_with_tag(tag::context::END_OF_MIB_VIEW),
        }
    }

    /// Decode from BER.
    ///
    /// An unrecognized tag fails with [`Error::UnsupportedType`]; its content is
    /// not consumed.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let tag_offset = decoder.offset();
        let tag = decoder.read_tag()?;
        let Some(kind) = ValueType::from_tag(tag) else {
            tracing::debug!(target: "snmp_lite::value", { snmp.offset = tag_offset, tag }, "unsupported value type");
            return Err(Error::UnsupportedType { tag });
        };
        let len = decoder.read_length()?;

        let value = match kind {
            ValueType::Boolean => {
                if len != 1 {
                    return Err(Error::decode(
                        decoder.offset(),
                        DecodeErrorKind::InvalidBoolean { length: len },
                    ));
                }
                Value::Boolean(decoder.read_byte()? != 0)
            }
            ValueType::Integer => Value::Integer(decoder.read_integer_value(len)?),
            ValueType::BitString => Value::BitString(decoder.read_bytes(len)?),
            ValueType::OctetString => Value::OctetString(decoder.read_bytes(len)?),
            ValueType::ObjectIdentifier => Value::ObjectIdentifier(decoder.read_oid_value(len)?),
            ValueType::ObjectDescription => Value::ObjectDescription(decoder.read_bytes(len)?),
            ValueType::IpAddress => Value::IpAddress(decoder.read_ip_address_value(len)?),
            ValueType::Counter32 => Value::Counter32(decoder.read_unsigned32_value(len)?),
            ValueType::Gauge32 => Value::Gauge32(decoder.read_unsigned32_value(len)?),
            ValueType::TimeTicks => Value::TimeTicks(decoder.read_unsigned32_value(len)?),
            ValueType::Opaque => Value::Opaque(decoder.read_bytes(len)?),
            ValueType::NsapAddress => Value::NsapAddress(decoder.read_bytes(len)?),
            ValueType::Counter64 => Value::Counter64(decoder.read_integer64_value(len)?),
            ValueType::UInteger32 => Value::UInteger32(decoder.read_unsigned32_value(len)?),
            ValueType::OpaqueFloat => {
                let bytes = read_fixed::<4>(decoder, len)?;
                Value::OpaqueFloat(f32::from_be_bytes(bytes))
            }
            ValueType::OpaqueDouble => {
                let bytes = read_fixed::<8>(decoder, len)?;
                Value::OpaqueDouble(f64::from_be_bytes(bytes))
            }
            ValueType::Null => {
                if len != 0 {
                    return Err(Error::decode(
                        decoder.offset(),
                        DecodeErrorKind::InvalidNull,
                    ));
                }
                Value::Null
            }
            // Agents sometimes pad sentinels; the content is ignored.
            ValueType::NoSuchObject | ValueType::NoSuchInstance | ValueType::EndOfMibView => {
                decoder.read_bytes(len)?;
                match kind {
                    ValueType::NoSuchObject => Value::NoSuchObject,
                    ValueType::NoSuchInstance => Value::NoSuchInstance,
                    _ => Value::EndOfMibView,
                }
            }
        };

        Ok(value)
    }
}

fn read_fixed<const N: usize>(decoder: &mut Decoder, len: usize) -> Result<[u8; N]> {
    if len != N {
        return Err(Error::decode(
            decoder.offset(),
            DecodeErrorKind::InvalidFloatLength {
                length: len,
                expected: N,
            },
        ));
    }
    let bytes = decoder.read_bytes(N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn is_printable(text: &str) -> bool {
    text.chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) if is_printable(s) => f.write_str(s),
                _ => write!(f, "0x{}", hex::Bytes(data)),
            },
            Value::BitString(data)
            | Value::ObjectDescription(data)
            | Value::Opaque(data)
            | Value::NsapAddress(data) => write!(f, "0x{}", hex::Bytes(data)),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress(addr) => {
                write!(f, "{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
            }
            Value::Counter32(v) | Value::Gauge32(v) | Value::UInteger32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => {
                let secs = v / 100;
                let days = secs / 86400;
                let hours = (secs % 86400) / 3600;
                let mins = (secs % 3600) / 60;
                let s = secs % 60;
                write!(f, "{}d {}h {}m {}s", days, hours, mins, s)
            }
            Value::Counter64(v) => write!(f, "{}", v),
            Value::OpaqueFloat(v) => write!(f, "{}", v),
            Value::OpaqueDouble(v) => write!(f, "{}", v),
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                f.write_str(self.value_type().name())
            }
        }
    }
}

/// Convenience conversions for creating [`Value`] from common Rust types.
///
/// ```
/// use snmp_lite::Value;
///
/// let v: Value = 42i32.into();
/// assert_eq!(v.as_i32(), Some(42));
///
/// let v: Value = "hello".into();
/// assert_eq!(v.as_str(), Some("hello"));
///
/// let v: Value = 10_000_000_000u64.into();
/// assert_eq!(v.as_u64(), Some(10_000_000_000));
///
/// use std::net::Ipv4Addr;
/// let v: Value = Ipv4Addr::new(10, 0, 0, 1).into();
/// assert_eq!(v.as_ip(), Some(Ipv4Addr::new(10, 0, 0, 1)));
/// ```
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s))
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::OctetString(Bytes::copy_from_slice(data))
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::OctetString(data)
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

impl From<std::net::Ipv4Addr> for Value {
    fn from(addr: std::net::Ipv4Addr) -> Self {
        Value::IpAddress(addr.octets())
    }
}

impl From<[u8; 4]> for Value {
    fn from(addr: [u8; 4]) -> Self {
        Value::IpAddress(addr)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Counter64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::OpaqueFloat(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::OpaqueDouble(v)
    }
}
