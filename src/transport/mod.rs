//! Transport layer.
//!
//! The client talks to an agent through the [`Transport`] trait. [`UdpTransport`]
//! is the real implementation; [`MockTransport`] scripts replies for tests and is
//! available under `cfg(test)` or the `testing` feature.

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::ber::{Decoder, tag};
use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// A datagram path to one agent.
///
/// The client sends one frame and then waits for its reply; a missed deadline
/// is reported as [`Error::Timeout`](crate::Error::Timeout), which is the only
/// error the client retries.
pub trait Transport: Send + Sync {
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the reply to `request_id`.
    ///
    /// Returns the datagram and the address it came from.
    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send;

    fn peer_addr(&self) -> SocketAddr;

    fn local_addr(&self) -> SocketAddr;
}

/// Read the request id out of a community message without decoding varbinds.
///
/// `None` when the frame is not a well-formed v1/v2c header, including v3
/// frames, whose second element is a SEQUENCE rather than a community.
pub(crate) fn peek_request_id(data: Bytes) -> Option<i32> {
    let mut message = Decoder::new(data).read_sequence().ok()?;
    message.read_integer().ok()?;
    message.read_octet_string().ok()?;

    let pdu_tag = message.read_tag().ok()?;
    if !(tag::pdu::GET_REQUEST..=tag::pdu::REPORT).contains(&pdu_tag) {
        return None;
    }
    let _ = message.read_length().ok()?;
    message.read_integer().ok()
}
