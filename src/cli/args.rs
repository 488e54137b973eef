//! Command-line argument structures for the `snmp-lite` tool.

use clap::{Args, ValueEnum};
use std::time::Duration;

use crate::client::Auth;
use crate::client::WalkMode;
use crate::client::retry::{Backoff, Retry};
use crate::format::hex;
use crate::{Oid, Value, VarBind};

/// SNMP version for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    /// SNMPv1
    #[value(name = "1")]
    V1,
    /// SNMPv2c (default)
    #[default]
    #[value(name = "2c")]
    V2c,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `OID = TYPE: value`
    #[default]
    Human,
    /// Tab-separated `OID<TAB>value` for scripting.
    Raw,
}

/// Backoff strategy for CLI argument parsing.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum BackoffStrategy {
    /// No delay between retries (immediate retry on timeout).
    #[default]
    None,
    /// Fixed delay between each retry.
    Fixed,
    /// Exponential backoff: delay doubles after each attempt.
    Exponential,
}

/// Arguments shared by every subcommand.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Target host or host:port (default port 161).
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// SNMP version: 1 or 2c.
    #[arg(short = 'v', long = "snmp-version", default_value = "2c")]
    pub snmp_version: SnmpVersion,

    /// Community string.
    #[arg(short = 'c', long = "community", default_value = "public")]
    pub community: String,

    /// Request timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value = "5")]
    pub timeout: f64,

    /// Retry count.
    #[arg(short = 'r', long = "retries", default_value = "3")]
    pub retries: u32,

    /// Backoff strategy between retries: none, fixed, or exponential.
    #[arg(long = "backoff", default_value = "none")]
    pub backoff: BackoffStrategy,

    /// Backoff delay in milliseconds (initial delay for exponential, fixed delay otherwise).
    #[arg(long = "backoff-delay", default_value = "1000")]
    pub backoff_delay: u64,

    /// Maximum backoff delay in milliseconds (exponential only).
    #[arg(long = "backoff-max", default_value = "5000")]
    pub backoff_max: u64,

    /// Jitter factor for exponential backoff (0.0-1.0).
    #[arg(long = "backoff-jitter", default_value = "0.25")]
    pub backoff_jitter: f64,
}

impl CommonArgs {
    /// Target as `host:port`, adding port 161 when none is given.
    ///
    /// Bare IPv6 addresses are bracketed.
    pub fn target_addr(&self) -> String {
        let target = self.target.as_str();
        if target.starts_with('[') {
            if target.contains("]:") {
                target.to_string()
            } else {
                format!("{}:161", target)
            }
        } else if target.matches(':').count() > 1 {
            format!("[{}]:161", target)
        } else if target.contains(':') {
            target.to_string()
        } else {
            format!("{}:161", target)
        }
    }

    /// Community credentials for the selected version.
    pub fn auth(&self) -> Auth {
        match self.snmp_version {
            SnmpVersion::V1 => Auth::v1(self.community.clone()),
            SnmpVersion::V2c => Auth::v2c(self.community.clone()),
        }
    }

    /// Get the timeout as a Duration.
    pub fn timeout_duration(&self) -> Result<Duration, String> {
        Duration::try_from_secs_f64(self.timeout)
            .map_err(|_| format!("invalid timeout: {}", self.timeout))
    }

    /// Build a Retry configuration from the CLI arguments.
    pub fn retry_config(&self) -> Retry {
        let backoff = match self.backoff {
            BackoffStrategy::None => Backoff::None,
            BackoffStrategy::Fixed => Backoff::Fixed {
                delay: Duration::from_millis(self.backoff_delay),
            },
            BackoffStrategy::Exponential => Backoff::Exponential {
                initial: Duration::from_millis(self.backoff_delay),
                max: Duration::from_millis(self.backoff_max),
                jitter: self.backoff_jitter.clamp(0.0, 1.0),
            },
        };
        Retry {
            max_attempts: self.retries,
            backoff,
        }
    }
}

/// Output and diagnostics arguments.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format: human or raw.
    #[arg(short = 'O', long = "output", default_value = "human")]
    pub format: OutputFormat,

    /// Always show octet strings as hex.
    #[arg(long = "hex")]
    pub hex: bool,

    /// Print elapsed time after the operation.
    #[arg(long = "timing")]
    pub timing: bool,

    /// Debug logging of client events to stderr.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Trace logging, including encoded packets.
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl OutputArgs {
    /// Install a stderr tracing subscriber.
    ///
    /// `RUST_LOG` takes precedence over the flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let level = if self.trace {
            "snmp_lite=trace"
        } else if self.debug {
            "snmp_lite=debug"
        } else {
            "snmp_lite=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Render one binding.
    pub fn format_varbind(&self, vb: &VarBind) -> String {
        let value = match &vb.value {
            Value::OctetString(data) if self.hex => format!("0x{}", hex::Bytes(data)),
            other => other.to_string(),
        };
        match self.format {
            OutputFormat::Human => {
                format!("{} = {}: {}", vb.oid, vb.value.value_type().name(), value)
            }
            OutputFormat::Raw => format!("{}\t{}", vb.oid, value),
        }
    }
}

/// Walk-specific arguments.
#[derive(Debug, Args)]
pub struct WalkArgs {
    /// Use GETNEXT only.
    #[arg(long = "getnext", conflicts_with = "bulk")]
    pub getnext: bool,

    /// Use GETBULK only, with no GETNEXT fallback.
    #[arg(long = "bulk")]
    pub bulk: bool,

    /// GETBULK max-repetitions.
    #[arg(long = "max-rep", default_value = "25")]
    pub max_repetitions: u32,

    /// Stop after this many results.
    #[arg(long = "max-results")]
    pub max_results: Option<usize>,
}

impl WalkArgs {
    /// Walk strategy selected by the flags.
    pub fn walk_mode(&self) -> WalkMode {
        if self.getnext {
            WalkMode::GetNext
        } else if self.bulk {
            WalkMode::GetBulk
        } else {
            WalkMode::Auto
        }
    }
}

/// Type specifier for SET values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeSpec {
    /// INTEGER (i32)
    #[value(name = "i")]
    Integer,
    /// Gauge32 (u32)
    #[value(name = "u")]
    Unsigned,
    /// OCTET STRING from UTF-8
    #[value(name = "s")]
    String,
    /// OCTET STRING from hex
    #[value(name = "x")]
    HexString,
    /// OBJECT IDENTIFIER
    #[value(name = "o")]
    Oid,
    /// IpAddress
    #[value(name = "a")]
    IpAddress,
    /// TimeTicks
    #[value(name = "t")]
    TimeTicks,
    /// Counter32
    #[value(name = "c")]
    Counter32,
    /// Counter64
    #[value(name = "C")]
    Counter64,
}

/// Parse an OID argument. One leading dot is accepted, as in `.1.3.6.1`.
pub fn parse_oid(s: &str) -> Result<Oid, String> {
    Oid::parse(s).map_err(|e| e.to_string())
}

fn parse_number<N: std::str::FromStr>(s: &str, what: &str) -> Result<N, String> {
    s.parse().map_err(|_| format!("invalid {} value: {}", what, s))
}

impl TypeSpec {
    /// Parse a string value according to the type specifier.
    pub fn parse_value(&self, s: &str) -> Result<Value, String> {
        match self {
            TypeSpec::Integer => parse_number(s, "integer").map(Value::Integer),
            TypeSpec::Unsigned => parse_number(s, "unsigned").map(Value::Gauge32),
            TypeSpec::String => Ok(Value::OctetString(s.as_bytes().to_vec().into())),
            TypeSpec::HexString => {
                // separators such as spaces, colons and dashes are allowed
                let clean: String = s
                    .chars()
                    .filter(|c| !matches!(c, ' ' | ':' | '-'))
                    .collect();
                let clean = clean.strip_prefix("0x").unwrap_or(&clean);
                hex::decode(clean)
                    .map(|bytes| Value::OctetString(bytes.into()))
                    .ok_or_else(|| format!("invalid hex string: {}", s))
            }
            TypeSpec::Oid => Oid::parse(s)
                .map(Value::ObjectIdentifier)
                .map_err(|e| format!("invalid OID value: {}", e)),
            TypeSpec::IpAddress => s
                .parse::<std::net::Ipv4Addr>()
                .map(|addr| Value::IpAddress(addr.octets()))
                .map_err(|_| format!("invalid IP address: {}", s)),
            TypeSpec::TimeTicks => parse_number(s, "timeticks").map(Value::TimeTicks),
            TypeSpec::Counter32 => parse_number(s, "counter32").map(Value::Counter32),
            TypeSpec::Counter64 => parse_number(s, "counter64").map(Value::Counter64),
        }
    }
}
