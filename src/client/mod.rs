//! SNMP client implementation.

mod auth;
mod builder;
mod retry;
mod walk;

pub use auth::{Auth, CommunityVersion, Security, UsmCredentials};
pub use builder::ClientBuilder;
pub use retry::{Backoff, BackoffFn, Retry, RetryBuilder};
pub use walk::{BulkSupport, WalkMode};

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};
use crate::ber::tag;
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::{Transport, UdpTransport};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Span, instrument};

use walk::BulkCapability;

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum OIDs per request.
pub const DEFAULT_MAX_OIDS_PER_REQUEST: usize = 10;

/// Default max-repetitions for GETBULK rounds during a walk.
pub const DEFAULT_MAX_REPETITIONS: u32 = 25;

impl Client<UdpTransport> {
    /// Create a new SNMP client builder.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use snmp_lite::{Auth, Client, Retry};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> snmp_lite::Result<()> {
    /// let client = Client::builder("192.168.1.1:161", Auth::v2c("public"))
    ///     .timeout(Duration::from_secs(2))
    ///     .retry(Retry::fixed(2, Duration::from_millis(100)))
    ///     .connect()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder(target: impl Into<String>, auth: impl Into<Auth>) -> ClientBuilder {
        ClientBuilder::new(target, auth)
    }
}

/// SNMP client.
///
/// Generic over transport type, with [`UdpTransport`] as default. Cloning is
/// cheap and clones share the request-id counter and the GETBULK capability
/// learned by walks.
#[derive(Clone)]
pub struct Client<T: Transport = UdpTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T: Transport> {
    transport: T,
    config: ClientConfig,
    next_request_id: AtomicI32,
    bulk: BulkCapability,
    security: Option<Arc<dyn Security>>,
}

/// Client configuration.
///
/// Most users should use [`ClientBuilder`] rather than constructing this directly.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Credentials, which also select the SNMP version (default: v2c "public")
    pub auth: Auth,
    /// Request timeout (default: 5 seconds)
    pub timeout: Duration,
    /// Retry configuration (default: 3 retries, no backoff)
    pub retry: Retry,
    /// Maximum OIDs per request (default: 10)
    pub max_oids_per_request: usize,
    /// Max-repetitions for GETBULK walk rounds (default: 25)
    pub max_repetitions: u32,
    /// Walk operation mode (default: Auto)
    pub walk_mode: WalkMode,
    /// Maximum results from a single walk operation (default: None/unlimited)
    pub max_walk_results: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth: Auth::default(),
            timeout: DEFAULT_TIMEOUT,
            retry: Retry::default(),
            max_oids_per_request: DEFAULT_MAX_OIDS_PER_REQUEST,
            max_repetitions: DEFAULT_MAX_REPETITIONS,
            walk_mode: WalkMode::Auto,
            max_walk_results: None,
        }
    }
}

impl ClientConfig {
    /// The SNMP version selected by the credentials.
    pub fn version(&self) -> Version {
        self.auth.version()
    }
}

/// Seed for the request-id counter. Only needs to differ between runs.
fn request_id_seed() -> i32 {
    let mixed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32).rotate_left(16))
        .unwrap_or(1);
    ((mixed & 0x7FFF_FFFF) as i32).max(1)
}

/// Map an exception value in a reply to its error.
pub(crate) fn exception_error(vb: &VarBind) -> Option<Error> {
    let oid = vb.oid.clone();
    match vb.value {
        Value::NoSuchObject => Some(Error::NoSuchObject { oid }),
        Value::NoSuchInstance => Some(Error::NoSuchInstance { oid }),
        Value::EndOfMibView => Some(Error::EndOfMibView { oid }),
        _ => None,
    }
}

impl<T: Transport> Client<T> {
    /// Create a new client with the given transport and config.
    ///
    /// USM credentials need a [`Security`] collaborator; see
    /// [`with_security`](Self::with_security).
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self::from_parts(transport, config, None)
    }

    /// Create a client whose v3 messages are framed by `security`.
    pub fn with_security(transport: T, config: ClientConfig, security: Arc<dyn Security>) -> Self {
        Self::from_parts(transport, config, Some(security))
    }

    fn from_parts(
        transport: T,
        config: ClientConfig,
        security: Option<Arc<dyn Security>>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                next_request_id: AtomicI32::new(request_id_seed()),
                bulk: BulkCapability::new(),
                security,
            }),
        }
    }

    /// Get the peer (target) address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.transport.peer_addr()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// What walks have learned about the agent's GETBULK support.
    pub fn bulk_support(&self) -> BulkSupport {
        self.inner.bulk.get()
    }

    fn version(&self) -> Version {
        self.inner.config.version()
    }

    /// Generate the next request ID: positive, wrapping.
    fn next_request_id(&self) -> i32 {
        loop {
            let id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed) & i32::MAX;
            if id != 0 {
                return id;
            }
        }
    }

    fn encode_request(&self, pdu: &Pdu) -> Result<Bytes> {
        match &self.inner.config.auth {
            Auth::Community { version, community } => Ok(CommunityMessage::new(
                (*version).into(),
                Bytes::copy_from_slice(community.as_bytes()),
                pdu.clone(),
            )
            .encode()),
            Auth::Usm(credentials) => {
                let security = self.inner.security.as_ref().ok_or_else(|| {
                    tracing::debug!(target: "snmp_lite::client", "USM request without a security collaborator");
                    Error::encode(EncodeErrorKind::NoSecurityConfig)
                })?;
                security.wrap(credentials, pdu)
            }
        }
    }

    fn decode_response(&self, data: Bytes) -> Result<Pdu> {
        match &self.inner.config.auth {
            Auth::Community { version, .. } => {
                let message = CommunityMessage::decode(data)?;
                let expected: Version = (*version).into();
                if message.version != expected {
                    tracing::warn!(target: "snmp_lite::client", { %expected, actual = %message.version, peer = %self.peer_addr() }, "version mismatch in response");
                    return Err(Error::VersionMismatch {
                        expected,
                        actual: message.version,
                    });
                }
                Ok(message.into_pdu())
            }
            Auth::Usm(credentials) => {
                let security = self
                    .inner
                    .security
                    .as_ref()
                    .ok_or_else(|| Error::encode(EncodeErrorKind::NoSecurityConfig))?;
                security.unwrap(credentials, data)
            }
        }
    }

    /// Validate a decoded reply against the request it answers.
    fn check_response(&self, request_id: i32, pdu: Pdu) -> Result<Pdu> {
        if pdu.pdu_type != PduType::Response {
            tracing::debug!(target: "snmp_lite::client", { snmp.pdu_type = %pdu.pdu_type }, "reply is not a Response PDU");
            return Err(Error::decode(
                0,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::pdu::RESPONSE,
                    actual: pdu.pdu_type.tag(),
                },
            ));
        }

        if pdu.request_id != request_id {
            tracing::warn!(target: "snmp_lite::client", { expected_request_id = request_id, actual_request_id = pdu.request_id, peer = %self.peer_addr() }, "request ID mismatch in response");
            return Err(Error::RequestIdMismatch {
                expected: request_id,
                actual: pdu.request_id,
            });
        }

        if pdu.is_error() {
            return Err(Error::Snmp {
                target: Some(self.peer_addr()),
                status: pdu.error_status_enum(),
                index: pdu.error_index.max(0) as u32,
                oid: pdu.error_oid(),
            });
        }

        Ok(pdu)
    }

    /// One send and one receive, without retries.
    async fn exchange(&self, request_id: i32, data: &[u8]) -> Result<Pdu> {
        tracing::trace!(target: "snmp_lite::client", { snmp.bytes = data.len() }, "sending request");
        self.inner.transport.send(data).await?;

        let (response, _source) = self
            .inner
            .transport
            .recv(request_id, self.inner.config.timeout)
            .await?;
        tracing::trace!(target: "snmp_lite::client", { snmp.bytes = response.len() }, "received response");

        let pdu = self.decode_response(response)?;
        self.check_response(request_id, pdu)
    }

    /// Send a request and wait for its response, retrying timeouts.
    ///
    /// Cancellation is checked before every attempt and raced against each
    /// attempt and each backoff wait.
    #[instrument(
        level = "debug",
        skip(self, data, cancel),
        fields(
            snmp.target = %self.peer_addr(),
            snmp.request_id = request_id,
            snmp.attempt = tracing::field::Empty,
            snmp.elapsed_ms = tracing::field::Empty,
        )
    )]
    async fn send_and_recv(
        &self,
        request_id: i32,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Pdu> {
        let start = Instant::now();
        let retry = &self.inner.config.retry;
        let max_attempts = retry.max_attempts;

        for attempt in 0..=max_attempts {
            if cancel.is_cancelled() {
                tracing::debug!(target: "snmp_lite::client", "cancelled before send");
                return Err(Error::Cancelled);
            }

            Span::current().record("snmp.attempt", attempt);
            if attempt > 0 {
                tracing::debug!(target: "snmp_lite::client", "retrying request");
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(target: "snmp_lite::client", "cancelled while awaiting response");
                    return Err(Error::Cancelled);
                }
                result = self.exchange(request_id, data) => result,
            };

            match result {
                Ok(pdu) => {
                    Span::current().record("snmp.elapsed_ms", start.elapsed().as_millis() as u64);
                    return Ok(pdu);
                }
                Err(Error::Timeout { .. }) => {
                    if attempt < max_attempts {
                        let delay = retry.compute_delay(attempt);
                        if !delay.is_zero() {
                            tracing::debug!(target: "snmp_lite::client", { delay_ms = delay.as_millis() as u64 }, "backing off");
                            tokio::select! {
                                biased;
                                _ = cancel.cancelled() => {
                                    tracing::debug!(target: "snmp_lite::client", "cancelled during backoff");
                                    return Err(Error::Cancelled);
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                    }
                }
                Err(e) => {
                    Span::current().record("snmp.elapsed_ms", start.elapsed().as_millis() as u64);
                    return Err(e);
                }
            }
        }

        let elapsed = start.elapsed();
        Span::current().record("snmp.elapsed_ms", elapsed.as_millis() as u64);
        tracing::debug!(target: "snmp_lite::client", { request_id, peer = %self.peer_addr(), ?elapsed, retries = max_attempts }, "request timed out");
        Err(Error::Timeout {
            target: Some(self.peer_addr()),
            elapsed,
            request_id,
            retries: max_attempts,
        })
    }

    /// Encode, send and await a request PDU.
    async fn send_request(&self, pdu: Pdu, cancel: &CancellationToken) -> Result<Pdu> {
        tracing::debug!(target: "snmp_lite::client", { snmp.pdu_type = ?pdu.pdu_type, snmp.varbind_count = pdu.varbinds.len() }, "sending {} request", pdu.pdu_type);

        let data = self.encode_request(&pdu)?;
        let response = self.send_and_recv(pdu.request_id, &data, cancel).await?;

        tracing::debug!(target: "snmp_lite::client", { snmp.pdu_type = ?response.pdu_type, snmp.varbind_count = response.varbinds.len() }, "received {} response", response.pdu_type);

        Ok(response)
    }

    /// First varbind of a single-OID reply.
    fn single(&self, response: Pdu, op: &'static str) -> Result<VarBind> {
        response.varbinds.into_iter().next().ok_or_else(|| {
            tracing::debug!(target: "snmp_lite::client", { peer = %self.peer_addr(), op }, "empty response");
            Error::decode(0, DecodeErrorKind::EmptyResponse)
        })
    }

    /// GET a single OID.
    ///
    /// An exception value in the reply becomes [`Error::NoSuchObject`],
    /// [`Error::NoSuchInstance`] or [`Error::EndOfMibView`].
    pub async fn get(&self, oid: &Oid) -> Result<VarBind> {
        self.get_with_cancel(oid, &CancellationToken::new()).await
    }

    /// [`get`](Self::get) that gives up with [`Error::Cancelled`] once `cancel` fires.
    #[instrument(skip(self, cancel), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %oid))]
    pub async fn get_with_cancel(&self, oid: &Oid, cancel: &CancellationToken) -> Result<VarBind> {
        oid.validate()?;
        let pdu = Pdu::get_request(self.next_request_id(), std::slice::from_ref(oid));
        let response = self.send_request(pdu, cancel).await?;
        let varbind = self.single(response, "GET")?;

        match exception_error(&varbind) {
            Some(err) => Err(err),
            None => Ok(varbind),
        }
    }

    /// GET multiple OIDs.
    ///
    /// Lists longer than `max_oids_per_request` are split into batches. Results
    /// are returned in input order and exception values are returned as-is, so
    /// one missing object does not hide the others.
    ///
    /// ```rust,no_run
    /// # use snmp_lite::{Auth, Client, oid};
    /// # async fn example() -> snmp_lite::Result<()> {
    /// # let client = Client::builder("127.0.0.1:161", Auth::v2c("public")).connect().await?;
    /// let results = client.get_many(&[
    ///     oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),  // sysDescr
    ///     oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),  // sysUpTime
    /// ]).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get_many(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        for oid in oids {
            oid.validate()?;
        }
        self.batched(oids, "GET", |id, chunk| Pdu::get_request(id, chunk))
            .await
    }

    /// GETNEXT for a single OID. The reply is returned as-is.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %oid))]
    pub async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        oid.validate()?;
        let pdu = Pdu::get_next_request(self.next_request_id(), std::slice::from_ref(oid));
        let response = self.send_request(pdu, &CancellationToken::new()).await?;
        self.single(response, "GETNEXT")
    }

    /// GETNEXT for multiple OIDs, batched like [`get_many`](Self::get_many).
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get_next_many(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        for oid in oids {
            oid.validate()?;
        }
        self.batched(oids, "GETNEXT", |id, chunk| {
            Pdu::get_next_request(id, chunk)
        })
        .await
    }

    /// SET a single value.
    ///
    /// Exception values are refused before anything is sent. A non-zero error
    /// status in the reply becomes [`Error::Snmp`] and is never retried.
    pub async fn set(&self, varbind: VarBind) -> Result<VarBind> {
        self.set_with_cancel(varbind, &CancellationToken::new()).await
    }

    /// [`set`](Self::set) that gives up with [`Error::Cancelled`] once `cancel` fires.
    #[instrument(skip(self, varbind, cancel), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %varbind.oid))]
    pub async fn set_with_cancel(
        &self,
        varbind: VarBind,
        cancel: &CancellationToken,
    ) -> Result<VarBind> {
        varbind.check_request()?;
        let pdu = Pdu::set_request(self.next_request_id(), vec![varbind]);
        let response = self.send_request(pdu, cancel).await?;
        self.single(response, "SET")
    }

    /// SET multiple values, batched like [`get_many`](Self::get_many).
    ///
    /// Batches are independent SET requests: an error in a later batch does
    /// not undo earlier ones.
    #[instrument(skip(self, varbinds), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = varbinds.len()))]
    pub async fn set_many(&self, varbinds: &[VarBind]) -> Result<Vec<VarBind>> {
        for vb in varbinds {
            vb.check_request()?;
        }
        self.batched(varbinds, "SET", |id, chunk| {
            Pdu::set_request(id, chunk.to_vec())
        })
        .await
    }

    async fn batched<I>(
        &self,
        items: &[I],
        op: &'static str,
        build: impl Fn(i32, &[I]) -> Pdu,
    ) -> Result<Vec<VarBind>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let cancel = CancellationToken::new();
        let max_per_request = self.inner.config.max_oids_per_request.max(1);
        let num_batches = items.len().div_ceil(max_per_request);
        if num_batches > 1 {
            tracing::debug!(target: "snmp_lite::client", { snmp.oid_count = items.len(), snmp.max_per_request = max_per_request, snmp.batch_count = num_batches, op }, "splitting request into batches");
        }

        let mut all_results = Vec::with_capacity(items.len());
        for chunk in items.chunks(max_per_request) {
            let pdu = build(self.next_request_id(), chunk);
            let response = self.send_request(pdu, &cancel).await?;
            all_results.extend(response.varbinds);
        }

        Ok(all_results)
    }

    /// GETBULK request (SNMPv2c/v3 only).
    ///
    /// The first `non_repeaters` OIDs get one successor each; the rest get up to
    /// `max_repetitions` successors each.
    #[instrument(skip(self, oids), err, fields(
        snmp.target = %self.peer_addr(),
        snmp.oid_count = oids.len(),
        snmp.non_repeaters = non_repeaters,
        snmp.max_repetitions = max_repetitions
    ))]
    pub async fn get_bulk(
        &self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> Result<Vec<VarBind>> {
        self.get_bulk_with_cancel(oids, non_repeaters, max_repetitions, &CancellationToken::new())
            .await
    }

    async fn get_bulk_with_cancel(
        &self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
        cancel: &CancellationToken,
    ) -> Result<Vec<VarBind>> {
        if !self.version().supports_bulk() {
            return Err(Error::GetBulkNotSupportedInV1);
        }
        for oid in oids {
            oid.validate()?;
        }

        let pdu = Pdu::get_bulk(self.next_request_id(), non_repeaters, max_repetitions, oids);
        let response = self.send_request(pdu, cancel).await?;
        Ok(response.varbinds)
    }
}
