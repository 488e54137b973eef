//! Formatting helpers for byte payloads.
//!
//! ```
//! use snmp_lite::format::hex;
//!
//! assert_eq!(hex::encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
//!
//! // Lazy formatting for logging
//! let data = [0x00, 0xff];
//! assert_eq!(format!("{}", hex::Bytes(&data)), "00ff");
//! ```

pub mod hex;
