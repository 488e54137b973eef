//! Command-line support for the `snmp-lite` binary.

pub mod args;
