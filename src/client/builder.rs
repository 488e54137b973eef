//! Client builder.
//!
//! [`ClientBuilder`] is the single entry point for constructing clients. It
//! collects settings, validates them, and produces a [`Client`] over UDP or
//! over any other [`Transport`].

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::client::retry::Retry;
use crate::client::walk::WalkMode;
use crate::client::{
    Auth, ClientConfig, CommunityVersion, DEFAULT_MAX_OIDS_PER_REQUEST, DEFAULT_MAX_REPETITIONS,
    DEFAULT_TIMEOUT, Security,
};
use crate::error::{Error, Result};
use crate::transport::{Transport, UdpTransport};

use super::Client;

/// Builder for constructing SNMP clients.
///
/// # Example
///
/// ```rust,no_run
/// use snmp_lite::{Auth, ClientBuilder, Retry, WalkMode};
/// use std::time::Duration;
///
/// # async fn example() -> snmp_lite::Result<()> {
/// let client = ClientBuilder::new("192.168.1.1:161", Auth::v2c("public"))
///     .timeout(Duration::from_secs(2))
///     .retry(Retry::exponential(4).max_delay(Duration::from_secs(2)))
///     .walk_mode(WalkMode::Auto)
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    target: String,
    auth: Auth,
    timeout: Duration,
    retry: Retry,
    max_oids_per_request: usize,
    max_repetitions: u32,
    walk_mode: WalkMode,
    max_walk_results: Option<usize>,
    security: Option<Arc<dyn Security>>,
}

impl ClientBuilder {
    /// Create a new client builder.
    ///
    /// * `target` - The target address (e.g., "192.168.1.1:161")
    /// * `auth` - Community string or USM credentials
    pub fn new(target: impl Into<String>, auth: impl Into<Auth>) -> Self {
        Self {
            target: target.into(),
            auth: auth.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: Retry::default(),
            max_oids_per_request: DEFAULT_MAX_OIDS_PER_REQUEST,
            max_repetitions: DEFAULT_MAX_REPETITIONS,
            walk_mode: WalkMode::Auto,
            max_walk_results: None,
            security: None,
        }
    }

    /// Set the request timeout (default: 5 seconds).
    ///
    /// This is the wait for one response. A request that keeps timing out
    /// may take `timeout * (retries + 1)` plus backoff.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration (default: 3 retries, no backoff).
    ///
    /// ```rust
    /// use snmp_lite::{Auth, ClientBuilder, Retry};
    /// use std::time::Duration;
    ///
    /// let builder = ClientBuilder::new("192.168.1.1:161", Auth::v2c("public"))
    ///     .retry(Retry::custom(3, |attempt| Duration::from_millis(100 << attempt)));
    /// ```
    pub fn retry(mut self, retry: impl Into<Retry>) -> Self {
        self.retry = retry.into();
        self
    }

    /// Set the maximum OIDs per request (default: 10).
    ///
    /// Longer `get_many`/`set_many` lists are split into batches.
    pub fn max_oids_per_request(mut self, max: usize) -> Self {
        self.max_oids_per_request = max;
        self
    }

    /// Set max-repetitions for GETBULK walk rounds (default: 25).
    ///
    /// Higher values mean fewer round-trips but larger replies, which some
    /// agents truncate or answer with tooBig.
    pub fn max_repetitions(mut self, max: u32) -> Self {
        self.max_repetitions = max;
        self
    }

    /// Override walk behavior (default: Auto).
    ///
    /// - `WalkMode::Auto`: GETBULK with GETNEXT fallback on v2c/v3, GETNEXT on v1
    /// - `WalkMode::GetNext`: Always use GETNEXT
    /// - `WalkMode::GetBulk`: Always use GETBULK (rejected for v1)
    pub fn walk_mode(mut self, mode: WalkMode) -> Self {
        self.walk_mode = mode;
        self
    }

    /// Set maximum results from a single walk (default: unlimited).
    ///
    /// The walk ends normally when the limit is reached.
    pub fn max_walk_results(mut self, limit: usize) -> Self {
        self.max_walk_results = Some(limit);
        self
    }

    /// Set the SNMPv3 security collaborator. Required for USM credentials.
    pub fn security(mut self, security: Arc<dyn Security>) -> Self {
        self.security = Some(security);
        self
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        match &self.auth {
            Auth::Usm(creds) => {
                if self.security.is_none() {
                    return Err(Error::Config(
                        "USM credentials require a security collaborator".into(),
                    ));
                }
                if creds.username().is_empty() {
                    return Err(Error::Config("USM username is empty".into()));
                }
            }
            Auth::Community {
                version: CommunityVersion::V1,
                ..
            } if self.walk_mode == WalkMode::GetBulk => {
                return Err(Error::Config("GETBULK not supported in SNMPv1".into()));
            }
            Auth::Community { .. } => {}
        }

        if self.max_oids_per_request == 0 {
            return Err(Error::Config("max_oids_per_request must be at least 1".into()));
        }

        Ok(())
    }

    /// Resolve target address to SocketAddr.
    fn resolve_target(&self) -> Result<SocketAddr> {
        self.target
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("could not resolve address '{}': {}", self.target, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("could not resolve address '{}'", self.target)))
    }

    fn build_config(&self) -> ClientConfig {
        ClientConfig {
            auth: self.auth.clone(),
            timeout: self.timeout,
            retry: self.retry.clone(),
            max_oids_per_request: self.max_oids_per_request,
            max_repetitions: self.max_repetitions,
            walk_mode: self.walk_mode,
            max_walk_results: self.max_walk_results,
        }
    }

    fn build_inner<T: Transport>(self, transport: T) -> Client<T> {
        let config = self.build_config();
        match self.security {
            Some(security) => Client::with_security(transport, config, security),
            None => Client::new(transport, config),
        }
    }

    /// Connect over UDP.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the target does not
    /// resolve, or the socket cannot be set up.
    pub async fn connect(self) -> Result<Client<UdpTransport>> {
        self.validate()?;
        let addr = self.resolve_target()?;
        let transport = UdpTransport::connect(addr).await?;
        Ok(self.build_inner(transport))
    }

    /// Build a client over an existing transport.
    ///
    /// The builder's target string is not used; the transport already knows
    /// its peer.
    pub fn build_with<T: Transport>(self, transport: T) -> Result<Client<T>> {
        self.validate()?;
        Ok(self.build_inner(transport))
    }
}
