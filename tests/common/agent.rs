//! In-process SNMP agent for testing.
//!
//! Serves a fixed MIB over UDP using the crate's own message codec. Binds an
//! ephemeral localhost port and shuts down on drop.

use snmp_lite::message::CommunityMessage;
use snmp_lite::pdu::{Pdu, PduType};
use snmp_lite::{ErrorStatus, Oid, Value, VarBind};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::common::fixtures;

#[derive(Default)]
struct Behavior {
    reject_bulk: bool,
    drop_first: usize,
}

struct Shared {
    mib: Mutex<BTreeMap<Oid, Value>>,
    requests: Mutex<Vec<PduType>>,
    received: AtomicUsize,
    behavior: Behavior,
}

/// An in-process SNMP agent.
pub struct TestAgent {
    addr: SocketAddr,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl TestAgent {
    /// Agent serving the system group.
    pub async fn new() -> Self {
        TestAgentBuilder::new().start().await
    }

    /// Agent serving `data`.
    pub async fn with_data(data: BTreeMap<Oid, Value>) -> Self {
        TestAgentBuilder::new().data(data).start().await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// PDU types received so far, in order. Dropped requests are included.
    pub fn requests(&self) -> Vec<PduType> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn set(&self, oid: Oid, value: Value) {
        self.shared.mib.lock().unwrap().insert(oid, value);
    }

    pub fn get(&self, oid: &Oid) -> Option<Value> {
        self.shared.mib.lock().unwrap().get(oid).cloned()
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct TestAgentBuilder {
    data: BTreeMap<Oid, Value>,
    behavior: Behavior,
}

impl TestAgentBuilder {
    pub fn new() -> Self {
        Self {
            data: fixtures::system_mib(),
            behavior: Behavior::default(),
        }
    }

    pub fn data(mut self, data: BTreeMap<Oid, Value>) -> Self {
        self.data = data;
        self
    }

    /// Answer every GETBULK with genErr, like an agent without bulk support.
    pub fn reject_bulk(mut self) -> Self {
        self.behavior.reject_bulk = true;
        self
    }

    /// Silently drop the first `n` requests.
    pub fn drop_first(mut self, n: usize) -> Self {
        self.behavior.drop_first = n;
        self
    }

    pub async fn start(self) -> TestAgent {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test agent");
        let addr = socket.local_addr().expect("test agent address");
        let shared = Arc::new(Shared {
            mib: Mutex::new(self.data),
            requests: Mutex::new(Vec::new()),
            received: AtomicUsize::new(0),
            behavior: self.behavior,
        });
        let cancel = CancellationToken::new();

        let task_shared = shared.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            loop {
                let (len, peer) = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    r = socket.recv_from(&mut buf) => match r {
                        Ok(r) => r,
                        Err(_) => break,
                    },
                };
                let data = bytes::Bytes::copy_from_slice(&buf[..len]);
                if let Some(reply) = task_shared.handle(data) {
                    let _ = socket.send_to(&reply, peer).await;
                }
            }
        });

        TestAgent {
            addr,
            shared,
            cancel,
        }
    }
}

impl Shared {
    fn handle(&self, data: bytes::Bytes) -> Option<bytes::Bytes> {
        let msg = CommunityMessage::decode(data).ok()?;
        self.requests.lock().unwrap().push(msg.pdu.pdu_type);

        let seen = self.received.fetch_add(1, Ordering::SeqCst);
        if seen < self.behavior.drop_first {
            return None;
        }

        let request = &msg.pdu;
        let mut response = Pdu {
            pdu_type: PduType::Response,
            request_id: request.request_id,
            error_status: 0,
            error_index: 0,
            varbinds: Vec::new(),
        };

        let mut mib = self.mib.lock().unwrap();
        match request.pdu_type {
            PduType::GetRequest => {
                response.varbinds = request
                    .varbinds
                    .iter()
                    .map(|vb| {
                        let value = mib.get(&vb.oid).cloned().unwrap_or(Value::NoSuchObject);
                        VarBind::new(vb.oid.clone(), value)
                    })
                    .collect();
            }
            PduType::GetNextRequest => {
                response.varbinds = request
                    .varbinds
                    .iter()
                    .map(|vb| next_after(&mib, &vb.oid))
                    .collect();
            }
            PduType::GetBulkRequest if self.behavior.reject_bulk => {
                response.error_status = ErrorStatus::GenErr.as_i32();
                response.error_index = 1;
                response.varbinds = request.varbinds.clone();
            }
            PduType::GetBulkRequest => {
                // non-repeaters is always zero from the client's walks
                let mut cursor = request.varbinds.first()?.oid.clone();
                for _ in 0..request.error_index.max(0) {
                    let vb = next_after(&mib, &cursor);
                    let end = matches!(vb.value, Value::EndOfMibView);
                    cursor = vb.oid.clone();
                    response.varbinds.push(vb);
                    if end {
                        break;
                    }
                }
            }
            PduType::SetRequest => {
                for vb in &request.varbinds {
                    mib.insert(vb.oid.clone(), vb.value.clone());
                }
                response.varbinds = request.varbinds.clone();
            }
            _ => return None,
        }

        Some(CommunityMessage::new(msg.version, msg.community, response).encode())
    }
}

fn next_after(mib: &BTreeMap<Oid, Value>, oid: &Oid) -> VarBind {
    use std::ops::Bound;
    mib.range((Bound::Excluded(oid.clone()), Bound::Unbounded))
        .next()
        .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
        .unwrap_or_else(|| VarBind::new(oid.clone(), Value::EndOfMibView))
}
