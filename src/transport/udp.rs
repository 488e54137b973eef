//! UDP transport implementation.
//!
//! One connected socket serves every clone of a [`UdpTransport`]. A background
//! task owns the receive side and hands each datagram to the call waiting on
//! its request id, so concurrent requests on one client never steal each
//! other's replies.

use super::{Transport, peek_request_id};
use crate::error::{Error, Result};
use crate::util::bind_local_for;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = 65535;

type Reply = io::Result<Bytes>;

/// UDP transport for a single target.
///
/// Each `UdpTransport` owns a connected UDP socket to a specific target.
/// Cloning shares the socket; the receive task stops when the last clone is
/// dropped.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    dispatch: Arc<Dispatch>,
    local_addr: SocketAddr,
    _recv_task: DropGuard,
}

/// Request ids in flight, each with the channel its reply goes to.
struct Dispatch {
    socket: UdpSocket,
    target: SocketAddr,
    pending: Mutex<HashMap<i32, Slot>>,
}

/// `rx` stays here from `send` until `recv` picks it up, so a reply that
/// beats the waiter is kept rather than lost.
struct Slot {
    tx: Option<oneshot::Sender<Reply>>,
    rx: Option<oneshot::Receiver<Reply>>,
    since: Instant,
}

impl Slot {
    fn new() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            tx: Some(tx),
            rx: None,
            since: Instant::now(),
        };
        (slot, rx)
    }
}

impl Dispatch {
    fn pending(&self) -> MutexGuard<'_, HashMap<i32, Slot>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(&self, request_id: i32) {
        self.pending().entry(request_id).or_insert_with(|| {
            let (mut slot, rx) = Slot::new();
            slot.rx = Some(rx);
            slot
        });
    }

    fn take_receiver(&self, request_id: i32) -> oneshot::Receiver<Reply> {
        let mut pending = self.pending();
        if let Some(rx) = pending.get_mut(&request_id).and_then(|slot| slot.rx.take()) {
            return rx;
        }
        let (slot, rx) = Slot::new();
        pending.insert(request_id, slot);
        rx
    }

    fn unregister(&self, request_id: i32) {
        self.pending().remove(&request_id);
    }

    /// Hand `data` to the request it answers. Duplicates and replies nobody
    /// waits for return `false`.
    fn deliver(&self, request_id: i32, data: Bytes) -> bool {
        let tx = self
            .pending()
            .get_mut(&request_id)
            .and_then(|slot| slot.tx.take());
        match tx {
            Some(tx) => tx.send(Ok(data)).is_ok(),
            None => false,
        }
    }

    /// A frame whose request id cannot be read (v3 frames, garbage) goes to
    /// the request that has waited longest, which then fails to decode it or
    /// hands it to its security collaborator.
    fn deliver_unmatched(&self, data: Bytes) -> bool {
        let mut pending = self.pending();
        let tx = pending
            .values_mut()
            .filter(|slot| slot.rx.is_none() && slot.tx.is_some())
            .min_by_key(|slot| slot.since)
            .and_then(|slot| slot.tx.take());
        match tx {
            Some(tx) => tx.send(Ok(data)).is_ok(),
            None => false,
        }
    }

    /// A connected socket reports ICMP errors on receive; every request still
    /// waiting sees the error.
    fn fail_all(&self, err: &io::Error) {
        for slot in self.pending().values_mut() {
            if let Some(tx) = slot.tx.take() {
                let _ = tx.send(Err(io::Error::new(err.kind(), err.to_string())));
            }
        }
    }
}

/// Removes a pending entry when the request it belongs to is abandoned.
struct Registration<'a> {
    dispatch: &'a Dispatch,
    request_id: i32,
    armed: bool,
}

impl<'a> Registration<'a> {
    fn new(dispatch: &'a Dispatch, request_id: i32) -> Self {
        Self {
            dispatch,
            request_id,
            armed: true,
        }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.dispatch.unregister(self.request_id);
        }
    }
}

impl UdpTransport {
    /// Connect to a target address.
    ///
    /// Creates an ephemeral UDP socket bound to the appropriate address family.
    /// For IPv6 targets, the socket has `IPV6_V6ONLY` set to true. Must be
    /// called inside a Tokio runtime; the receive task is spawned here.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        tracing::event!(target: "snmp_lite::transport", tracing::Level::DEBUG, snmp.target = %target, "connecting UDP transport");

        let io_err = |e| Error::Io {
            target: Some(target),
            source: e,
        };

        let socket = bind_local_for(target).await.map_err(io_err)?;
        socket.connect(target).await.map_err(io_err)?;
        let local_addr = socket.local_addr().map_err(io_err)?;

        tracing::event!(
            target: "snmp_lite::transport",
            tracing::Level::DEBUG,
            snmp.target = %target,
            snmp.local_addr = %local_addr,
            "UDP transport connected"
        );

        let dispatch = Arc::new(Dispatch {
            socket,
            target,
            pending: Mutex::new(HashMap::new()),
        });
        let stop = CancellationToken::new();
        tokio::spawn(recv_loop(dispatch.clone(), stop.clone()));

        Ok(Self {
            inner: Arc::new(UdpTransportInner {
                dispatch,
                local_addr,
                _recv_task: stop.drop_guard(),
            }),
        })
    }
}

async fn recv_loop(dispatch: Arc<Dispatch>, stop: CancellationToken) {
    let target = dispatch.target;
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            received = dispatch.socket.recv(&mut buf) => received,
        };

        match received {
            Ok(len) => {
                let data = Bytes::copy_from_slice(&buf[..len]);
                let request_id = peek_request_id(data.clone());
                let delivered = match request_id {
                    Some(id) => dispatch.deliver(id, data),
                    None => dispatch.deliver_unmatched(data),
                };
                if delivered {
                    tracing::event!(
                        target: "snmp_lite::transport",
                        tracing::Level::TRACE,
                        snmp.target = %target,
                        snmp.request_id = ?request_id,
                        snmp.bytes = len,
                        "UDP recv complete"
                    );
                } else {
                    tracing::event!(
                        target: "snmp_lite::transport",
                        tracing::Level::DEBUG,
                        snmp.target = %target,
                        snmp.request_id = ?request_id,
                        snmp.bytes = len,
                        "discarding response with no waiting request"
                    );
                }
            }
            Err(e) => {
                tracing::event!(target: "snmp_lite::transport", tracing::Level::DEBUG, snmp.target = %target, error = %e, "UDP recv error");
                dispatch.fail_all(&e);
            }
        }
    }

    tracing::event!(target: "snmp_lite::transport", tracing::Level::TRACE, snmp.target = %target, "UDP receive task stopped");
}

impl Transport for UdpTransport {
    /// Registers the request id before the datagram leaves, so the reply has
    /// somewhere to go even if it arrives before [`recv`](Transport::recv).
    async fn send(&self, data: &[u8]) -> Result<()> {
        let dispatch = &*self.inner.dispatch;
        tracing::event!(
            target: "snmp_lite::transport",
            tracing::Level::TRACE,
            snmp.target = %dispatch.target,
            snmp.bytes = data.len(),
            "UDP send"
        );

        let registration = peek_request_id(Bytes::copy_from_slice(data)).map(|request_id| {
            dispatch.register(request_id);
            Registration::new(dispatch, request_id)
        });

        dispatch.socket.send(data).await.map_err(|e| Error::Io {
            target: Some(dispatch.target),
            source: e,
        })?;

        if let Some(registration) = registration {
            registration.keep();
        }
        Ok(())
    }

    /// Replies to other request ids go to their own waiters. A late reply to
    /// a retried attempt reuses the same id and is accepted.
    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<(Bytes, SocketAddr)> {
        let dispatch = &*self.inner.dispatch;
        let target = dispatch.target;
        let deadline = Instant::now() + recv_timeout;

        let rx = dispatch.take_receiver(request_id);
        let _registration = Registration::new(dispatch, request_id);

        match timeout_at(deadline, rx).await {
            Ok(Ok(Ok(data))) => Ok((data, target)),
            Ok(Ok(Err(e))) => Err(Error::Io {
                target: Some(target),
                source: e,
            }),
            // the sender only goes away with the receive task
            Ok(Err(_)) => Err(Error::Io {
                target: Some(target),
                source: io::Error::new(io::ErrorKind::BrokenPipe, "UDP receive task stopped"),
            }),
            Err(_) => {
                tracing::event!(
                    target: "snmp_lite::transport",
                    tracing::Level::TRACE,
                    snmp.target = %target,
                    snmp.request_id = request_id,
                    "UDP recv timeout"
                );
                Err(Error::Timeout {
                    target: Some(target),
                    elapsed: recv_timeout,
                    request_id,
                    retries: 0,
                })
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.dispatch.target
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }
}
