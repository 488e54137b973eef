//! BER (Basic Encoding Rules) codec for the SNMP subset of ASN.1.
//!
//! Only definite-length, single-byte-tag encodings are supported. Decoding is
//! zero-copy over [`bytes::Bytes`]; encoding fills a buffer back to front so each
//! length is known by the time its header is written.

mod decode;
mod encode;
pub mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::{EncodeBuf, integer_content_len, unsigned32_content_len, unsigned64_content_len};
pub use length::{MAX_LENGTH, decode_length, encode_length, length_encoded_len};
