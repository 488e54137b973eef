//! Credential configuration for the SNMP client.
//!
//! A client carries exactly one credential shape: a community string for
//! SNMPv1/v2c, or an opaque SNMPv3 USM credential bag. The client never looks
//! inside USM credentials. It forwards them to the [`Security`] collaborator
//! supplied at construction, which frames and opens v3 messages.
//!
//! ```rust
//! use snmp_lite::{Auth, UsmCredentials};
//!
//! let auth = Auth::v2c("public");
//! assert_eq!(auth.version(), snmp_lite::Version::V2c);
//!
//! let auth: Auth = Auth::usm("admin")
//!     .with("auth_protocol", "SHA-256")
//!     .with("auth_password", "authpassword")
//!     .into();
//! assert_eq!(auth.version(), snmp_lite::Version::V3);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::pdu::Pdu;
use crate::version::Version;

/// SNMP version for community-based authentication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommunityVersion {
    /// SNMPv1
    V1,
    /// SNMPv2c
    #[default]
    V2c,
}

impl From<CommunityVersion> for Version {
    fn from(version: CommunityVersion) -> Self {
        match version {
            CommunityVersion::V1 => Version::V1,
            CommunityVersion::V2c => Version::V2c,
        }
    }
}

/// Authentication configuration for SNMP clients.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Community string authentication (SNMPv1 or v2c).
    Community {
        /// SNMP version (V1 or V2c)
        version: CommunityVersion,
        /// Community string
        community: String,
    },
    /// User-based Security Model (SNMPv3).
    Usm(UsmCredentials),
}

impl Default for Auth {
    fn default() -> Self {
        Auth::v2c("public")
    }
}

impl Auth {
    /// SNMPv1 community authentication.
    ///
    /// ```rust
    /// use snmp_lite::Auth;
    ///
    /// let auth = Auth::v1("private");
    /// ```
    pub fn v1(community: impl Into<String>) -> Self {
        Auth::Community {
            version: CommunityVersion::V1,
            community: community.into(),
        }
    }

    /// SNMPv2c community authentication.
    ///
    /// `Auth::default()` is equivalent to `Auth::v2c("public")`.
    pub fn v2c(community: impl Into<String>) -> Self {
        Auth::Community {
            version: CommunityVersion::V2c,
            community: community.into(),
        }
    }

    /// Start SNMPv3 USM credentials for `username`.
    ///
    /// The result converts into [`Auth`] wherever one is expected.
    pub fn usm(username: impl Into<String>) -> UsmCredentials {
        UsmCredentials::new(username)
    }

    /// The message version these credentials select.
    pub fn version(&self) -> Version {
        match self {
            Auth::Community { version, .. } => (*version).into(),
            Auth::Usm(_) => Version::V3,
        }
    }
}

impl From<UsmCredentials> for Auth {
    fn from(credentials: UsmCredentials) -> Self {
        Auth::Usm(credentials)
    }
}

/// Opaque SNMPv3 USM credentials.
///
/// A username plus named parameters (protocols, passwords, context and so on)
/// whose meaning belongs to the [`Security`] implementation. `Debug` output
/// never shows parameter values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UsmCredentials {
    username: String,
    params: BTreeMap<String, String>,
}

impl UsmCredentials {
    /// Credentials for `username` with no parameters.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add or replace a named parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The USM user name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Look up a named parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Iterate over parameters in key order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for UsmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsmCredentials")
            .field("username", &self.username)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// SNMPv3 security collaborator.
///
/// Produces a complete v3 message for an outgoing PDU and recovers the PDU
/// from an incoming message. Engine discovery, keys, authentication and
/// privacy all live behind this trait.
pub trait Security: Send + Sync {
    /// Frame `pdu` as a v3 message for `credentials`.
    fn wrap(&self, credentials: &UsmCredentials, pdu: &Pdu) -> Result<Bytes>;

    /// Verify and open a v3 message received for `credentials`.
    fn unwrap(&self, credentials: &UsmCredentials, data: Bytes) -> Result<Pdu>;
}
