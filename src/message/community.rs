//! Community-string framing shared by SNMPv1 and SNMPv2c.
//!
//! ```text
//! Message ::= SEQUENCE { version INTEGER (0 | 1), community OCTET STRING, data PDU }
//! ```

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;
use bytes::Bytes;

/// A v1 or v2c message: a PDU plus the version and community it travels with.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    pub fn v1(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self::new(Version::V1, community, pdu)
    }

    pub fn v2c(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self::new(Version::V2c, community, pdu)
    }

    pub fn encode(&self) -> Bytes {
        // EncodeBuf fills back to front: last field first.
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|body| {
            self.pdu.encode(body);
            body.push_octet_string(&self.community);
            body.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    /// Parse a datagram.
    ///
    /// Version numbers other than 0 and 1 fail with
    /// [`DecodeErrorKind::UnknownVersion`], so a v3 frame never parses here.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut body = Decoder::new(data).read_sequence()?;
        let version = read_version(&mut body)?;
        let community = body.read_octet_string()?;
        let pdu = Pdu::decode(&mut body)?;
        Ok(Self {
            version,
            community,
            pdu,
        })
    }

    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }
}

fn read_version(body: &mut Decoder) -> Result<Version> {
    let offset = body.offset();
    let raw = body.read_integer()?;
    match Version::from_i32(raw) {
        Some(version @ (Version::V1 | Version::V2c)) => Ok(version),
        _ => {
            let kind = DecodeErrorKind::UnknownVersion(raw);
            tracing::debug!(target: "snmp_lite::message", { snmp.offset = offset, kind = %kind }, "unsupported message version");
            Err(Error::decode(offset, kind))
        }
    }
}
