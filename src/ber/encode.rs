//! BER encoding.
//!
//! [`EncodeBuf`] writes back to front: content is pushed first, then its length,
//! then its tag. Constructed types therefore never need a second pass to patch
//! lengths, and callers push the children of a SEQUENCE in reverse order.

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;
use bytes::Bytes;

/// Reverse-growing encode buffer.
#[derive(Debug, Default)]
pub struct EncodeBuf {
    // bytes stored in reverse wire order
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend a single byte.
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Prepend raw bytes, given in wire order.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Prepend a length header.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, count) = encode_length(len);
        self.buf.extend_from_slice(&bytes[..count]);
    }

    /// Prepend a tag byte.
    #[inline]
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Prepend a constructed TLV whose content is written by `f`.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let start = self.len();
        f(self);
        let content_len = self.len() - start;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Prepend a SEQUENCE whose content is written by `f`.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Prepend a primitive TLV with the given content.
    pub fn push_primitive(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Prepend a BOOLEAN (0xFF for true).
    pub fn push_bool(&mut self, value: bool) {
        self.push_primitive(tag::universal::BOOLEAN, &[if value { 0xFF } else { 0x00 }]);
    }

    /// Prepend an INTEGER in minimal two's-complement form.
    pub fn push_integer(&mut self, value: i32) {
        self.push_signed_with_tag(tag::universal::INTEGER, value);
    }

    /// Prepend a signed integer carried under an arbitrary tag.
    pub fn push_signed_with_tag(&mut self, tag: u8, value: i32) {
        let bytes = value.to_be_bytes();
        let len = integer_content_len(value);
        self.push_primitive(tag, &bytes[4 - len..]);
    }

    /// Prepend an unsigned 32-bit integer under `tag`, zero-padded when the
    /// high bit would otherwise read as a sign.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        self.push_unsigned(tag, value as u64, unsigned32_content_len(value));
    }

    /// Prepend a Counter64.
    pub fn push_integer64(&mut self, value: u64) {
        self.push_unsigned(
            tag::application::COUNTER64,
            value,
            unsigned64_content_len(value),
        );
    }

    fn push_unsigned(&mut self, tag: u8, value: u64, len: usize) {
        let start = self.len();
        let mut remaining = value;
        for _ in 0..len {
            self.buf.push(remaining as u8);
            remaining >>= 8;
        }
        debug_assert_eq!(self.len() - start, len);
        self.push_length(len);
        self.push_tag(tag);
    }

    /// Prepend an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_primitive(tag::universal::OCTET_STRING, data);
    }

    /// Prepend a NULL.
    pub fn push_null(&mut self) {
        self.push_null_with_tag(tag::universal::NULL);
    }

    /// Prepend an empty TLV under `tag` (NULL and the exception sentinels).
    pub fn push_null_with_tag(&mut self, tag: u8) {
        self.push_length(0);
        self.push_tag(tag);
    }

    /// Prepend an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber_smallvec();
        self.push_primitive(tag::universal::OBJECT_IDENTIFIER, &content);
    }

    /// Prepend an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_primitive(tag::application::IP_ADDRESS, &addr);
    }

    /// Return the encoded bytes in wire order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }

    /// Return the encoded bytes in wire order as a `Vec`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

/// Minimal two's-complement content length of a signed integer.
pub fn integer_content_len(value: i32) -> usize {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 3 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    4 - start
}

/// Content length of an unsigned 32-bit value, including any zero pad octet.
pub fn unsigned32_content_len(value: u32) -> usize {
    unsigned64_content_len(value as u64)
}

/// Content length of an unsigned 64-bit value, including any zero pad octet.
pub fn unsigned64_content_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let significant_bits = 64 - value.leading_zeros() as usize;
    // one extra bit for the sign position
    significant_bits / 8 + 1
}
