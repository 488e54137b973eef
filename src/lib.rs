// The Error enum carries OIDs inline for diagnostics.
#![allow(clippy::result_large_err)]

//! # snmp-lite
//!
//! Async SNMP management client for Rust.
//!
//! ## Features
//!
//! - SNMPv1 and v2c community requests, SNMPv3 through a pluggable [`Security`]
//! - GET, GETNEXT, GETBULK and SET with transparent batching
//! - Subtree walks that prefer GETBULK and fall back to GETNEXT per client
//! - Strict BER codec with typed decode errors
//! - Retry on timeout with configurable backoff and cooperative cancellation
//! - Typed scalar nodes in [`node`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_lite::{Auth, Client, oid};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_lite::Error> {
//!     let client = Client::builder("192.168.1.1:161", Auth::v2c("public"))
//!         .timeout(Duration::from_secs(5))
//!         .connect()
//!         .await?;
//!
//!     let result = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await?;
//!     println!("sysDescr: {}", result.value);
//!
//!     client
//!         .walk(&oid!(1, 3, 6, 1, 2, 1, 2, 2), |vb| {
//!             println!("{}", vb);
//!             Ok::<_, std::convert::Infallible>(())
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod client;
pub mod error;
pub mod format;
pub mod message;
pub mod node;
pub mod oid;
pub mod pdu;
pub mod transport;
pub mod value;
pub mod varbind;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use client::{
    Auth, Backoff, BulkSupport, Client, ClientBuilder, ClientConfig, CommunityVersion, Retry,
    RetryBuilder, Security, UsmCredentials, WalkMode,
};
pub use error::{
    BoxError, DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, OidErrorKind, Result,
};
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use transport::{Transport, UdpTransport};
pub use value::{Value, ValueType};
pub use varbind::{ScalarValue, VarBind};
pub use version::Version;

pub use tokio_util::sync::CancellationToken;
