//! SNMP message wrappers.
//!
//! Messages encapsulate PDUs with version and authentication information.
//! v1 and v2c use [`CommunityMessage`]. v3 framing is delegated to a
//! [`Security`](crate::client::Security) collaborator and never built here.

mod community;

pub use community::CommunityMessage;
