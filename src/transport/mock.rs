//! Mock transport for testing.
//!
//! Provides a programmable transport that can simulate various scenarios
//! without needing an actual network connection.

use super::Transport;
use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A mock response to return for a request.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this data as the response (request_id will be patched to match)
    Data(Bytes),
    /// Return this data as-is without patching request_id
    RawData(Bytes),
    /// Wait out the receive timeout, then fail with a timeout
    Timeout,
    /// Simulate an IO error
    IoError(String),
}

/// A recorded request sent through the mock transport.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// The raw request data
    pub data: Bytes,
    /// The PDU, when the data is a v1/v2c message
    pub pdu: Option<Pdu>,
}

impl RecordedRequest {
    /// The request id, when the data is a v1/v2c message.
    pub fn request_id(&self) -> Option<i32> {
        self.pdu.as_ref().map(|pdu| pdu.request_id)
    }

    /// The PDU type, when the data is a v1/v2c message.
    pub fn pdu_type(&self) -> Option<PduType> {
        self.pdu.as_ref().map(|pdu| pdu.pdu_type)
    }
}

struct MockTransportInner {
    target: SocketAddr,
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
    default_response: Option<MockResponse>,
    last_request_id: Option<i32>,
}

/// Mock transport for testing SNMP client functionality.
///
/// Responses are served in queue order, one per `recv`. An empty queue with no
/// default behaves like an agent that never answers.
///
/// ```rust
/// use snmp_lite::transport::{MockTransport, ResponseBuilder};
/// use snmp_lite::{Value, oid};
///
/// let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
/// mock.queue_response(
///     ResponseBuilder::new(1)
///         .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core-sw1"))
///         .build_v2c(b"public"),
/// );
/// mock.queue_timeout();
/// assert_eq!(mock.queued_response_count(), 2);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                target,
                responses: VecDeque::new(),
                requests: Vec::new(),
                default_response: None,
                last_request_id: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        // a panicking test thread must not hide the queue from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a data response.
    ///
    /// The request_id in the response is patched to match the last request
    /// sent. Use [`queue_raw_response`](Self::queue_raw_response) to bypass
    /// patching.
    pub fn queue_response(&self, data: impl Into<Bytes>) {
        self.lock()
            .responses
            .push_back(MockResponse::Data(data.into()));
    }

    /// Queue a raw data response without request_id patching.
    pub fn queue_raw_response(&self, data: impl Into<Bytes>) {
        self.lock()
            .responses
            .push_back(MockResponse::RawData(data.into()));
    }

    /// Queue a timeout.
    pub fn queue_timeout(&self) {
        self.lock().responses.push_back(MockResponse::Timeout);
    }

    /// Queue an IO error.
    pub fn queue_io_error(&self, msg: impl Into<String>) {
        self.lock()
            .responses
            .push_back(MockResponse::IoError(msg.into()));
    }

    /// Set a default response when the queue is empty.
    pub fn set_default_response(&self, response: MockResponse) {
        self.lock().default_response = Some(response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Get the number of queued responses remaining.
    pub fn queued_response_count(&self) -> usize {
        self.lock().responses.len()
    }

    /// Re-encode a v1/v2c response with `new_id`. Anything else is returned as-is.
    fn patch_response_request_id(data: Bytes, new_id: i32) -> Bytes {
        match CommunityMessage::decode(data.clone()) {
            Ok(mut msg) => {
                msg.pdu.request_id = new_id;
                msg.encode()
            }
            Err(_) => data,
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send {
        let data = Bytes::copy_from_slice(data);
        let pdu = CommunityMessage::decode(data.clone())
            .ok()
            .map(CommunityMessage::into_pdu);

        let mut inner = self.lock();
        inner.last_request_id = pdu.as_ref().map(|pdu| pdu.request_id);
        inner.requests.push(RecordedRequest { data, pdu });

        async { Ok(()) }
    }

    fn recv(
        &self,
        request_id: i32,
        timeout: Duration,
    ) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send {
        let (response, target, last_req_id) = {
            let mut guard = self.lock();
            let resp = guard
                .responses
                .pop_front()
                .or_else(|| guard.default_response.clone());
            (resp, guard.target, guard.last_request_id)
        };

        async move {
            match response {
                Some(MockResponse::Data(data)) => {
                    let patched = match last_req_id {
                        Some(req_id) => Self::patch_response_request_id(data, req_id),
                        None => data,
                    };
                    Ok((patched, target))
                }
                Some(MockResponse::RawData(data)) => Ok((data, target)),
                Some(MockResponse::IoError(msg)) => Err(Error::Io {
                    target: Some(target),
                    source: std::io::Error::other(msg),
                }),
                Some(MockResponse::Timeout) | None => {
                    tokio::time::sleep(timeout).await;
                    Err(Error::Timeout {
                        target: Some(target),
                        elapsed: timeout,
                        request_id,
                        retries: 0,
                    })
                }
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.lock().target
    }

    fn local_addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }
}

/// Builder for creating SNMP response messages for testing.
///
/// This helps construct valid SNMP response bytes without manually
/// crafting BER encoding.
pub struct ResponseBuilder {
    request_id: i32,
    varbinds: Vec<VarBind>,
    error_status: i32,
    error_index: i32,
}

impl ResponseBuilder {
    /// Create a new response builder with the given request ID.
    pub fn new(request_id: i32) -> Self {
        Self {
            request_id,
            varbinds: Vec::new(),
            error_status: 0,
            error_index: 0,
        }
    }

    /// Add a varbind to the response.
    pub fn varbind(mut self, oid: Oid, value: Value) -> Self {
        self.varbinds.push(VarBind::new(oid, value));
        self
    }

    /// Set the error status.
    pub fn error_status(mut self, status: i32) -> Self {
        self.error_status = status;
        self
    }

    /// Set the error index.
    pub fn error_index(mut self, index: i32) -> Self {
        self.error_index = index;
        self
    }

    /// Build the Response PDU.
    pub fn build_pdu(self) -> Pdu {
        Pdu {
            pdu_type: PduType::Response,
            request_id: self.request_id,
            error_status: self.error_status,
            error_index: self.error_index,
            varbinds: self.varbinds,
        }
    }

    /// Build a response message for `version`.
    pub fn build(self, version: Version, community: &[u8]) -> Bytes {
        CommunityMessage::new(version, Bytes::copy_from_slice(community), self.build_pdu()).encode()
    }

    /// Build a v2c SNMP response message.
    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        self.build(Version::V2c, community)
    }

    /// Build a v1 SNMP response message.
    pub fn build_v1(self, community: &[u8]) -> Bytes {
        self.build(Version::V1, community)
    }
}
