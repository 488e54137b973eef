//! Shared test infrastructure.
//!
//! Provides an in-process UDP agent, MIB fixtures and mock client helpers.

// not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod agent;
pub mod fixtures;

pub use agent::{TestAgent, TestAgentBuilder};
pub use fixtures::{
    combined, interface_table, interfaces_subtree, nonexistent_oid, sys_descr, sys_name,
    sys_uptime, system_mib, system_subtree,
};

use snmp_lite::transport::{MockTransport, ResponseBuilder};
use snmp_lite::{Auth, Client, Oid, Retry, Value};
use std::time::Duration;

pub const COMMUNITY: &[u8] = b"public";

pub fn mock() -> MockTransport {
    MockTransport::new("127.0.0.1:161".parse().unwrap())
}

/// v2c client over `mock` with no retries and a short timeout.
pub fn mock_client(mock: &MockTransport) -> Client<MockTransport> {
    Client::builder("127.0.0.1:161", Auth::v2c("public"))
        .timeout(Duration::from_millis(100))
        .retry(Retry::none())
        .build_with(mock.clone())
        .unwrap()
}

/// A v2c response carrying `varbinds`. The mock patches the request id.
pub fn response(varbinds: impl IntoIterator<Item = (Oid, Value)>) -> bytes::Bytes {
    varbinds
        .into_iter()
        .fold(ResponseBuilder::new(1), |b, (oid, value)| b.varbind(oid, value))
        .build_v2c(COMMUNITY)
}

/// A v2c error response.
pub fn error_response(status: i32, index: i32, oid: Oid) -> bytes::Bytes {
    ResponseBuilder::new(1)
        .error_status(status)
        .error_index(index)
        .varbind(oid, Value::Null)
        .build_v2c(COMMUNITY)
}
