//! Tag registry.
//!
//! Every value kind and PDU type has a fixed one-byte tag. These values are part of
//! the wire protocol and never change.

/// ASN.1 universal class tags.
pub mod universal {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const OBJECT_DESCRIPTOR: u8 = 0x07;
    pub const SEQUENCE: u8 = 0x30;
}

/// SMI application class tags (RFC 2578, RFC 1442 for NsapAddress and UInteger32).
pub mod application {
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const NSAP_ADDRESS: u8 = 0x45;
    pub const COUNTER64: u8 = 0x46;
    pub const UINTEGER32: u8 = 0x47;
    /// Opaque-encoded IEEE 754 single precision (draft-perkins-opaque).
    pub const OPAQUE_FLOAT: u8 = 0x78;
    /// Opaque-encoded IEEE 754 double precision (draft-perkins-opaque).
    pub const OPAQUE_DOUBLE: u8 = 0x79;
}

/// Context class tags for the varbind exception values (RFC 3416).
pub mod context {
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// PDU tags (context class, constructed).
pub mod pdu {
    pub const GET_REQUEST: u8 = 0xA0;
    pub const GET_NEXT_REQUEST: u8 = 0xA1;
    pub const RESPONSE: u8 = 0xA2;
    pub const SET_REQUEST: u8 = 0xA3;
    pub const TRAP_V1: u8 = 0xA4;
    pub const GET_BULK_REQUEST: u8 = 0xA5;
    pub const INFORM_REQUEST: u8 = 0xA6;
    pub const TRAP_V2: u8 = 0xA7;
    pub const REPORT: u8 = 0xA8;
}
