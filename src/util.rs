//! Socket setup.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Bind a UDP socket on an ephemeral port in the address family of `target`.
///
/// IPv6 sockets are `IPV6_V6ONLY`, so v4-mapped traffic never reaches them.
pub(crate) async fn bind_local_for(target: SocketAddr) -> io::Result<UdpSocket> {
    let (domain, any) = match target.ip() {
        IpAddr::V4(_) => (Domain::IPV4, IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        IpAddr::V6(_) => (Domain::IPV6, IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if domain == Domain::IPV6 {
        socket.set_only_v6(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::new(any, 0).into())?;

    UdpSocket::from_std(socket.into())
}
