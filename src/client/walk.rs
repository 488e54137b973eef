//! Subtree walks.
//!
//! A walk repeatedly asks the agent for the successors of a cursor OID and
//! hands each leaf under the root to a callback, in order. Rounds use GETBULK
//! while the agent is believed to support it and GETNEXT otherwise. What the
//! client learns about GETBULK support is kept for the client's lifetime.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{BoxError, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::Transport;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

use super::{Client, exception_error};

/// Walk operation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalkMode {
    /// GETBULK with fallback to GETNEXT on v2c/v3, GETNEXT on v1 (default).
    #[default]
    Auto,
    /// Always use GETNEXT (slower but more compatible).
    GetNext,
    /// Always use GETBULK, never fall back (errors on v1).
    GetBulk,
}

/// What a client knows about the agent's GETBULK support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkSupport {
    /// No GETBULK round has completed yet.
    Unknown,
    /// A GETBULK round succeeded.
    Supported,
    /// The agent rejected GETBULK; walks use GETNEXT from now on.
    Unsupported,
}

const UNKNOWN: u8 = 0;
const SUPPORTED: u8 = 1;
const UNSUPPORTED: u8 = 2;

/// Tri-state GETBULK capability shared by all walks on one client.
///
/// Only ever leaves `Unknown`, and only once.
#[derive(Debug)]
pub(crate) struct BulkCapability(AtomicU8);

impl BulkCapability {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(UNKNOWN))
    }

    pub(crate) fn get(&self) -> BulkSupport {
        match self.0.load(Ordering::Acquire) {
            SUPPORTED => BulkSupport::Supported,
            UNSUPPORTED => BulkSupport::Unsupported,
            _ => BulkSupport::Unknown,
        }
    }

    pub(crate) fn mark_supported(&self) {
        let _ = self
            .0
            .compare_exchange(UNKNOWN, SUPPORTED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Record that GETBULK was rejected. Returns true when the capability is
    /// now unsupported, whoever set it; false when a GETBULK already succeeded.
    pub(crate) fn mark_unsupported(&self) -> bool {
        match self
            .0
            .compare_exchange(UNKNOWN, UNSUPPORTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == UNSUPPORTED,
        }
    }
}

/// True if a GETBULK outcome says the agent does not do GETBULK.
///
/// That is a genErr, noSuchName or tooBig status, a received reply that
/// cannot be decoded, or a reply with no varbinds. Failures raised before
/// anything is sent say nothing about the agent.
fn bulk_rejected(result: &Result<Vec<VarBind>>) -> bool {
    match result {
        Ok(varbinds) => varbinds.is_empty(),
        Err(Error::Snmp { status, .. }) => matches!(
            status,
            ErrorStatus::GenErr | ErrorStatus::NoSuchName | ErrorStatus::TooBig
        ),
        Err(Error::Decode { .. }) => true,
        Err(_) => false,
    }
}

/// What to do with one returned varbind.
enum Step {
    Deliver(VarBind),
    Stop,
}

/// Ephemeral state of one walk.
struct WalkSession {
    root: Oid,
    cursor: Oid,
    delivered: usize,
    limit: Option<usize>,
    done: bool,
}

impl WalkSession {
    fn new(root: Oid, limit: Option<usize>) -> Self {
        Self {
            cursor: root.clone(),
            root,
            delivered: 0,
            limit,
            done: false,
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|max| self.delivered >= max)
    }

    fn accept(&mut self, vb: VarBind) -> Result<Step> {
        if self.limit_reached() || matches!(vb.value, Value::EndOfMibView) {
            return Ok(Step::Stop);
        }
        if !self.root.is_root_of(&vb.oid) {
            return Ok(Step::Stop);
        }
        if let Some(err) = exception_error(&vb) {
            return Err(err);
        }
        if vb.oid <= self.cursor {
            return Err(Error::NonIncreasingOid {
                previous: self.cursor.clone(),
                current: vb.oid,
            });
        }

        self.cursor = vb.oid.clone();
        self.delivered += 1;
        Ok(Step::Deliver(vb))
    }
}

impl<T: Transport> Client<T> {
    /// Walk the subtree under `root`, calling `callback` once per leaf.
    ///
    /// Leaves arrive in strictly increasing OID order. The walk ends normally
    /// when a returned OID leaves the subtree, on endOfMibView, or after
    /// `max_walk_results` leaves. An agent error, a callback error or a
    /// non-increasing OID aborts it; a callback error is surfaced as
    /// [`Error::Callback`] with the original error as its source.
    ///
    /// ```rust,no_run
    /// # use snmp_lite::{Auth, Client, oid};
    /// # async fn example() -> snmp_lite::Result<()> {
    /// # let client = Client::builder("127.0.0.1:161", Auth::v2c("public")).connect().await?;
    /// client
    ///     .walk(&oid!(1, 3, 6, 1, 2, 1, 1), |vb| {
    ///         println!("{}", vb);
    ///         Ok::<_, std::convert::Infallible>(())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn walk<F, E>(&self, root: &Oid, callback: F) -> Result<()>
    where
        F: FnMut(VarBind) -> std::result::Result<(), E>,
        E: Into<BoxError>,
    {
        self.walk_with_cancel(root, &CancellationToken::new(), callback)
            .await
    }

    /// [`walk`](Self::walk) that stops with [`Error::Cancelled`] once `cancel` fires.
    ///
    /// The token is checked before every round-trip and during backoff waits.
    /// A round-trip in flight when it fires is abandoned and its reply ignored.
    #[instrument(skip(self, cancel, callback), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %root))]
    pub async fn walk_with_cancel<F, E>(
        &self,
        root: &Oid,
        cancel: &CancellationToken,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(VarBind) -> std::result::Result<(), E>,
        E: Into<BoxError>,
    {
        root.validate()?;

        let mode = self.inner.config.walk_mode;
        let version = self.version();
        if mode == WalkMode::GetBulk && !version.supports_bulk() {
            return Err(Error::GetBulkNotSupportedInV1);
        }

        let mut session = WalkSession::new(root.clone(), self.inner.config.max_walk_results);
        let mut rounds = 0usize;

        while !session.done && !session.limit_reached() {
            let varbinds = if self.use_bulk(mode, version) {
                let result = self.bulk_round(&session.cursor, cancel).await;
                rounds += 1;

                if mode == WalkMode::Auto && bulk_rejected(&result) {
                    if self.inner.bulk.mark_unsupported() {
                        tracing::debug!(target: "snmp_lite::client", { snmp.cursor = %session.cursor }, "agent rejected GETBULK, falling back to GETNEXT");
                        continue;
                    }
                } else if result.is_ok() {
                    self.inner.bulk.mark_supported();
                }

                result?
            } else {
                let result = self.next_round(&session.cursor, cancel).await;
                rounds += 1;
                match result {
                    // v1 agents report the end of the MIB view this way
                    Err(Error::Snmp {
                        status: ErrorStatus::NoSuchName,
                        ..
                    }) if version == Version::V1 => break,
                    other => other?,
                }
            };

            if varbinds.is_empty() {
                break;
            }

            for vb in varbinds {
                match session.accept(vb)? {
                    Step::Deliver(vb) => callback(vb).map_err(|e| Error::Callback(e.into()))?,
                    Step::Stop => {
                        session.done = true;
                        break;
                    }
                }
            }
        }

        tracing::debug!(target: "snmp_lite::client", { snmp.results = session.delivered, snmp.rounds = rounds }, "walk complete");
        Ok(())
    }

    /// Walk the subtree under `root` and collect every leaf.
    pub async fn walk_collect(&self, root: &Oid) -> Result<Vec<VarBind>> {
        let mut results = Vec::new();
        self.walk(root, |vb| {
            results.push(vb);
            Ok::<_, std::convert::Infallible>(())
        })
        .await?;
        Ok(results)
    }

    fn use_bulk(&self, mode: WalkMode, version: Version) -> bool {
        match mode {
            WalkMode::GetNext => false,
            WalkMode::GetBulk => true,
            WalkMode::Auto => {
                version.supports_bulk() && self.inner.bulk.get() != BulkSupport::Unsupported
            }
        }
    }

    async fn bulk_round(&self, cursor: &Oid, cancel: &CancellationToken) -> Result<Vec<VarBind>> {
        let max_repetitions = i32::try_from(self.inner.config.max_repetitions).unwrap_or(i32::MAX);
        self.get_bulk_with_cancel(std::slice::from_ref(cursor), 0, max_repetitions, cancel)
            .await
    }

    async fn next_round(&self, cursor: &Oid, cancel: &CancellationToken) -> Result<Vec<VarBind>> {
        let pdu = Pdu::get_next_request(self.next_request_id(), std::slice::from_ref(cursor));
        let response = self.send_request(pdu, cancel).await?;
        Ok(response.varbinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Auth, ClientConfig, Retry};
    use crate::error::{DecodeErrorKind, EncodeErrorKind};
    use crate::oid;
    use crate::pdu::PduType;
    use crate::transport::{MockTransport, ResponseBuilder};
    use std::time::Duration;

    fn mock_client(mock: &MockTransport, mode: WalkMode) -> Client<MockTransport> {
        let config = ClientConfig {
            auth: Auth::v2c("public"),
            timeout: Duration::from_millis(50),
            retry: Retry::none(),
            walk_mode: mode,
            max_repetitions: 10,
            ..ClientConfig::default()
        };
        Client::new(mock.clone(), config)
    }

    fn reply(varbinds: &[(Oid, Value)]) -> bytes::Bytes {
        varbinds
            .iter()
            .fold(ResponseBuilder::new(1), |b, (oid, value)| {
                b.varbind(oid.clone(), value.clone())
            })
            .build_v2c(b"public")
    }

    #[test]
    fn test_capability_leaves_unknown_once() {
        let cap = BulkCapability::new();
        assert_eq!(cap.get(), BulkSupport::Unknown);
        cap.mark_supported();
        assert_eq!(cap.get(), BulkSupport::Supported);
        assert!(!cap.mark_unsupported());
        assert_eq!(cap.get(), BulkSupport::Supported);

        let cap = BulkCapability::new();
        assert!(cap.mark_unsupported());
        cap.mark_supported();
        assert_eq!(cap.get(), BulkSupport::Unsupported);
        assert!(cap.mark_unsupported());
    }

    #[test]
    fn test_bulk_rejected_signals() {
        let snmp = |status| -> Result<Vec<VarBind>> {
            Err(Error::Snmp {
                target: None,
                status,
                index: 0,
                oid: None,
            })
        };
        assert!(bulk_rejected(&Ok(Vec::new())));
        assert!(bulk_rejected(&snmp(ErrorStatus::GenErr)));
        assert!(bulk_rejected(&snmp(ErrorStatus::NoSuchName)));
        assert!(bulk_rejected(&snmp(ErrorStatus::TooBig)));
        assert!(bulk_rejected(&Err(Error::decode(
            3,
            DecodeErrorKind::TruncatedData
        ))));

        assert!(!bulk_rejected(&snmp(ErrorStatus::NoAccess)));
        assert!(!bulk_rejected(&Err(Error::Cancelled)));
        assert!(!bulk_rejected(&Err(Error::encode(
            EncodeErrorKind::NoSecurityConfig
        ))));
        assert!(!bulk_rejected(&oid!(9).validate().map(|_| Vec::new())));
        assert!(!bulk_rejected(&Ok(vec![VarBind::null(oid!(1, 3))])));
    }

    #[test]
    fn test_session_rules() {
        let mut session = WalkSession::new(oid!(1, 3, 6, 1, 2), Some(2));

        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1));
        assert!(matches!(session.accept(vb), Ok(Step::Deliver(_))));

        let same = VarBind::new(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1));
        assert!(matches!(
            session.accept(same),
            Err(Error::NonIncreasingOid { .. })
        ));

        let outside = VarBind::new(oid!(1, 3, 7), Value::Integer(1));
        assert!(matches!(session.accept(outside), Ok(Step::Stop)));

        let end = VarBind::new(oid!(1, 3, 6, 1, 2, 5), Value::EndOfMibView);
        assert!(matches!(session.accept(end), Ok(Step::Stop)));

        let missing = VarBind::new(oid!(1, 3, 6, 1, 2, 5), Value::NoSuchObject);
        assert!(matches!(
            session.accept(missing),
            Err(Error::NoSuchObject { .. })
        ));

        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 2), Value::Integer(2));
        assert!(matches!(session.accept(vb), Ok(Step::Deliver(_))));
        assert!(session.limit_reached());
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 3), Value::Integer(3));
        assert!(matches!(session.accept(vb), Ok(Step::Stop)));
    }

    #[tokio::test]
    async fn test_bulk_walk_marks_supported() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(reply(&[
            (oid!(1, 3, 6, 1, 2, 1, 1), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2, 1, 2), Value::Integer(2)),
            (oid!(1, 3, 6, 1, 2, 2, 1), Value::Integer(3)),
        ]));

        let client = mock_client(&mock, WalkMode::Auto);
        let results = client.walk_collect(&oid!(1, 3, 6, 1, 2, 1)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(client.bulk_support(), BulkSupport::Supported);
        assert_eq!(mock.requests().len(), 1);
        assert_eq!(
            mock.requests()[0].pdu_type(),
            Some(PduType::GetBulkRequest)
        );
    }

    #[tokio::test]
    async fn test_local_encode_failure_keeps_capability_unknown() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        let config = ClientConfig {
            auth: Auth::usm("admin").into(),
            retry: Retry::none(),
            ..ClientConfig::default()
        };
        let client = Client::new(mock.clone(), config);

        let err = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Encode {
                kind: EncodeErrorKind::NoSecurityConfig
            }
        ));
        assert!(mock.requests().is_empty());
        assert_eq!(client.bulk_support(), BulkSupport::Unknown);
    }

    #[tokio::test]
    async fn test_forced_bulk_does_not_fall_back() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(
            ResponseBuilder::new(1)
                .error_status(ErrorStatus::GenErr.as_i32())
                .build_v2c(b"public"),
        );

        let client = mock_client(&mock, WalkMode::GetBulk);
        let err = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Snmp {
                status: ErrorStatus::GenErr,
                ..
            }
        ));
        assert_eq!(client.bulk_support(), BulkSupport::Unknown);
    }

    #[tokio::test]
    async fn test_error_after_supported_is_surfaced() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(reply(&[(oid!(1, 3, 6, 1, 1), Value::Integer(1))]));
        mock.queue_response(
            ResponseBuilder::new(1)
                .error_status(ErrorStatus::GenErr.as_i32())
                .build_v2c(b"public"),
        );

        let client = mock_client(&mock, WalkMode::Auto);
        let err = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap_err();
        assert!(matches!(err, Error::Snmp { .. }));
        assert_eq!(client.bulk_support(), BulkSupport::Supported);
    }

    #[tokio::test]
    async fn test_v1_walk_uses_getnext_and_ends_on_no_such_name() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 9), Value::Integer(9))
                .build_v1(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 9), Value::Null)
                .error_status(ErrorStatus::NoSuchName.as_i32())
                .error_index(1)
                .build_v1(b"public"),
        );

        let config = ClientConfig {
            auth: Auth::v1("public"),
            retry: Retry::none(),
            ..ClientConfig::default()
        };
        let client = Client::new(mock.clone(), config);
        let results = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(
            mock.requests()
                .iter()
                .all(|r| r.pdu_type() == Some(PduType::GetNextRequest))
        );
        assert_eq!(client.bulk_support(), BulkSupport::Unknown);
    }

    #[tokio::test]
    async fn test_forced_bulk_rejected_on_v1() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        let config = ClientConfig {
            auth: Auth::v1("public"),
            walk_mode: WalkMode::GetBulk,
            ..ClientConfig::default()
        };
        let client = Client::new(mock.clone(), config);
        let err = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap_err();
        assert!(matches!(err, Error::GetBulkNotSupportedInV1));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_max_walk_results_stops_requests() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(reply(&[
            (oid!(1, 3, 6, 1, 1), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2), Value::Integer(2)),
        ]));

        let config = ClientConfig {
            max_walk_results: Some(2),
            retry: Retry::none(),
            ..ClientConfig::default()
        };
        let client = Client::new(mock.clone(), config);
        let results = client.walk_collect(&oid!(1, 3, 6, 1)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(mock.requests().len(), 1);
    }
}
