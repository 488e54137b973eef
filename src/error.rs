//! Error types for snmp-lite.
//!
//! - [`Error`] - The error type returned by every fallible operation
//! - [`ErrorStatus`] - SNMP error status codes carried in response PDUs (RFC 3416)
//! - [`DecodeErrorKind`], [`EncodeErrorKind`], [`OidErrorKind`] - detail for codec and
//!   identifier failures
//!
//! All enums are `#[non_exhaustive]` where new variants are plausible.
//!
//! # Matching on errors
//!
//! ```no_run
//! use snmp_lite::{Auth, Client, Error, oid};
//!
//! # async fn example() -> snmp_lite::Result<()> {
//! let client = Client::builder("192.168.1.1:161", Auth::v2c("public"))
//!     .connect()
//!     .await?;
//!
//! match client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).await {
//!     Ok(varbind) => println!("{}", varbind),
//!     Err(Error::NoSuchObject { oid }) => println!("{} is not implemented", oid),
//!     Err(Error::Timeout { retries, .. }) => println!("no answer after {} retries", retries),
//!     Err(e) => println!("failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type returned by walk callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Expected different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length form (0x80) is not permitted.
    IndefiniteLength,
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Integer content longer than the target width.
    IntegerTooLong { length: usize, max: usize },
    /// OID sub-identifier group not terminated before end of content.
    UnterminatedSubidentifier,
    /// OID sub-identifier exceeds 32 bits.
    SubidentifierOverflow,
    /// OID has more sub-identifiers than allowed.
    OidTooLong { count: usize, max: usize },
    /// Unknown SNMP version.
    UnknownVersion(i32),
    /// Unknown PDU type.
    UnknownPduType(u8),
    /// NULL with non-zero length.
    InvalidNull,
    /// BOOLEAN content is not exactly one octet.
    InvalidBoolean { length: usize },
    /// IP address content is not exactly four octets.
    InvalidIpAddressLength { length: usize },
    /// Floating point content has the wrong width.
    InvalidFloatLength { length: usize, expected: usize },
    /// Length field too long.
    LengthTooLong { octets: usize },
    /// Length exceeds maximum.
    LengthExceedsMax { length: usize, max: usize },
    /// Response PDU carries no varbinds.
    EmptyResponse,
    /// Insufficient data for read.
    InsufficientData { needed: usize, available: usize },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not permitted"),
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::IntegerTooLong { length, max } => {
                write!(f, "integer of {} octets exceeds {} octets", length, max)
            }
            Self::UnterminatedSubidentifier => write!(f, "unterminated OID sub-identifier"),
            Self::SubidentifierOverflow => write!(f, "OID sub-identifier exceeds 32 bits"),
            Self::OidTooLong { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {}", v),
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{:02X}", t),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidBoolean { length } => {
                write!(f, "BOOLEAN must be 1 byte, got {}", length)
            }
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {}", length)
            }
            Self::InvalidFloatLength { length, expected } => {
                write!(f, "floating point value must be {} bytes, got {}", expected, length)
            }
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::EmptyResponse => write!(f, "empty response"),
            Self::InsufficientData { needed, available } => {
                write!(f, "need {} bytes but only {} remaining", needed, available)
            }
        }
    }
}

/// Encode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeErrorKind {
    /// A sentinel value (noSuchObject, noSuchInstance, endOfMibView) was placed in a request.
    SentinelInRequest { tag: u8 },
    /// USM credentials supplied without a security collaborator.
    NoSecurityConfig,
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SentinelInRequest { tag } => {
                write!(f, "sentinel value (tag 0x{:02X}) cannot be sent in a request", tag)
            }
            Self::NoSecurityConfig => write!(f, "no security collaborator configured"),
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OidErrorKind {
    /// Empty OID string.
    Empty,
    /// Segment contains a character other than an ASCII digit.
    InvalidCharacter,
    /// Two dots without a segment between them.
    EmptySegment,
    /// OID string ends with a dot.
    TrailingDot,
    /// Segment is negative.
    NegativeArc,
    /// Segment exceeds 2^32 - 1.
    ArcOverflow,
    /// First arc must be 0, 1, or 2.
    InvalidFirstArc(u32),
    /// Second arc must be at most 39 under first arcs 0 and 1.
    InvalidSecondArc { first: u32, second: u32 },
    /// OID too short (minimum 2 arcs).
    TooShort,
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidCharacter => write!(f, "non-digit character in OID"),
            Self::EmptySegment => write!(f, "consecutive dots in OID"),
            Self::TrailingDot => write!(f, "trailing dot in OID"),
            Self::NegativeArc => write!(f, "negative sub-identifier"),
            Self::ArcOverflow => write!(f, "sub-identifier exceeds 4294967295"),
            Self::InvalidFirstArc(v) => write!(f, "first arc must be 0, 1, or 2, got {}", v),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc must be at most 39 under {}, got {}", first, second)
            }
            Self::TooShort => write!(f, "OID must have at least 2 arcs"),
        }
    }
}

/// Joined OID validation failures, in the order they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidErrors(pub Vec<OidErrorKind>);

impl std::fmt::Display for OidErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

macro_rules! error_statuses {
    ($($(#[$doc:meta])* $code:literal => $variant:ident $name:literal,)+) => {
        /// Error status of a response PDU (RFC 3416).
        ///
        /// ```
        /// use snmp_lite::ErrorStatus;
        ///
        /// let status = ErrorStatus::from_i32(2);
        /// assert_eq!(status, ErrorStatus::NoSuchName);
        /// assert_eq!(status.as_i32(), 2);
        /// assert_eq!(status.to_string(), "noSuchName");
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[non_exhaustive]
        pub enum ErrorStatus {
            $($(#[$doc])* $variant,)+
            /// A code outside RFC 3416.
            Unknown(i32),
        }

        impl ErrorStatus {
            pub fn from_i32(value: i32) -> Self {
                match value {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn as_i32(&self) -> i32 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => *code,
                }
            }

            /// RFC 3416 name, `None` for unknown codes.
            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($name),)+
                    Self::Unknown(_) => None,
                }
            }
        }
    };
}

error_statuses! {
    0 => NoError "noError",
    1 => TooBig "tooBig",
    /// SNMPv1 only; v2c agents answer with exception values instead.
    2 => NoSuchName "noSuchName",
    3 => BadValue "badValue",
    4 => ReadOnly "readOnly",
    5 => GenErr "genErr",
    6 => NoAccess "noAccess",
    7 => WrongType "wrongType",
    8 => WrongLength "wrongLength",
    9 => WrongEncoding "wrongEncoding",
    10 => WrongValue "wrongValue",
    11 => NoCreation "noCreation",
    12 => InconsistentValue "inconsistentValue",
    13 => ResourceUnavailable "resourceUnavailable",
    14 => CommitFailed "commitFailed",
    15 => UndoFailed "undoFailed",
    16 => AuthorizationError "authorizationError",
    17 => NotWritable "notWritable",
    18 => InconsistentName "inconsistentName",
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown({})", self.as_i32()),
        }
    }
}

/// The error type for all snmp-lite operations.
///
/// Variants group into codec failures ([`Decode`](Error::Decode),
/// [`Encode`](Error::Encode), [`InvalidOid`](Error::InvalidOid),
/// [`UnsupportedType`](Error::UnsupportedType)), value kind failures
/// ([`TypeMismatch`](Error::TypeMismatch)), agent answers ([`Snmp`](Error::Snmp) and the
/// sentinel variants), and exchange failures ([`Timeout`](Error::Timeout),
/// [`Cancelled`](Error::Cancelled), [`Io`](Error::Io)). Only `Timeout` is ever retried.
///
/// ```
/// use snmp_lite::Error;
///
/// fn is_missing(error: &Error) -> bool {
///     matches!(error, Error::NoSuchObject { .. } | Error::NoSuchInstance { .. })
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error{}: {source}", target.map(|t| format!(" communicating with {}", t)).unwrap_or_default())]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// Request timed out after all retries.
    #[error("timeout after {elapsed:?}{} (request_id={request_id}, retries={retries})", target.map(|t| format!(" waiting for {}", t)).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        request_id: i32,
        retries: u32,
    },

    /// Operation aborted through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// SNMP error status returned by the agent.
    #[error("SNMP error{}: {status} at index {index}", target.map(|t| format!(" from {}", t)).unwrap_or_default())]
    Snmp {
        target: Option<SocketAddr>,
        status: ErrorStatus,
        index: u32,
        oid: Option<Oid>,
    },

    /// Agent answered with the noSuchObject sentinel.
    #[error("no such object: {oid}")]
    NoSuchObject { oid: Oid },

    /// Agent answered with the noSuchInstance sentinel.
    #[error("no such instance: {oid}")]
    NoSuchInstance { oid: Oid },

    /// Agent answered a GET with the endOfMibView sentinel.
    #[error("end of MIB view at {oid}")]
    EndOfMibView { oid: Oid },

    /// Invalid OID text or arcs. Carries every violation found.
    #[error("invalid OID{}: {errors}", input.as_ref().map(|i| format!(" '{}'", i)).unwrap_or_default())]
    InvalidOid {
        errors: OidErrors,
        input: Option<Box<str>>,
    },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// Value tag with no decoder.
    #[error("unsupported value type: tag 0x{tag:02X}")]
    UnsupportedType { tag: u8 },

    /// Encoding error.
    #[error("encode error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// A value's kind does not match the kind that was expected.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Response request ID doesn't match.
    #[error("request ID mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Response version doesn't match request.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        expected: crate::version::Version,
        actual: crate::version::Version,
    },

    /// Walk received an OID that is not greater than the previous one.
    #[error("walk detected non-increasing OID: {previous} >= {current}")]
    NonIncreasingOid { previous: Oid, current: Oid },

    /// GETBULK requested on an SNMPv1 client.
    #[error("GETBULK is not supported in SNMPv1")]
    GetBulkNotSupportedInV1,

    /// Walk callback returned an error; the original error is the source.
    #[error("walk callback failed: {0}")]
    Callback(#[source] BoxError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an encode error.
    pub fn encode(kind: EncodeErrorKind) -> Self {
        Self::Encode { kind }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid {
            errors: OidErrors(vec![kind]),
            input: None,
        }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            errors: OidErrors(vec![kind]),
            input: Some(input.into()),
        }
    }

    /// The OID violations carried by an [`InvalidOid`](Error::InvalidOid) error.
    pub fn oid_errors(&self) -> &[OidErrorKind] {
        match self {
            Self::InvalidOid { errors, .. } => &errors.0,
            _ => &[],
        }
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Io { target, .. } => *target,
            Self::Timeout { target, .. } => *target,
            Self::Snmp { target, .. } => *target,
            _ => None,
        }
    }

    /// True for malformed-encoding failures (decode, encode and OID packing).
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Encode { .. } | Self::InvalidOid { .. }
        )
    }

    /// Borrow the error a walk callback returned, if this is one.
    ///
    /// ```
    /// use snmp_lite::Error;
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Stop;
    /// impl std::fmt::Display for Stop {
    ///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    ///         f.write_str("stop")
    ///     }
    /// }
    /// impl std::error::Error for Stop {}
    ///
    /// let err = Error::Callback(Box::new(Stop));
    /// assert_eq!(err.callback_error::<Stop>(), Some(&Stop));
    /// ```
    pub fn callback_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Callback(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
