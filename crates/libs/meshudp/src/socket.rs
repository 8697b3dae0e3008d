//! UDP multicast socket wrapper.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::error::MeshError;

/// A socket joined to one multicast group, used for both directions:
/// `send` targets the group, `recv_from` yields datagrams and their
/// sender address.
///
/// Must be constructed from within a tokio runtime.
pub struct MulticastSocket {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl MulticastSocket {
    /// Bind the port with address reuse (so several processes on one
    /// host can listen), then join the group on the default interface.
    pub fn bind(group: Ipv4Addr, port: u16) -> Result<Self, MeshError> {
        let bind_addr = SocketAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&bind_addr.into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
        log::debug!("joined multicast group {group} on port {port}");

        Ok(Self { socket, group: SocketAddrV4::new(group, port) })
    }

    /// Send one datagram to the group. Fire-and-forget: no
    /// acknowledgement, no retry.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize, MeshError> {
        Ok(self.socket.send_to(bytes, SocketAddr::from(self.group)).await?)
    }

    /// Wait for the next datagram. Cancellable: callers race this
    /// against a cancellation token.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), MeshError> {
        Ok(self.socket.recv_from(buf).await?)
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }

    pub fn local_addr(&self) -> Result<SocketAddr, MeshError> {
        Ok(self.socket.local_addr()?)
    }
}
