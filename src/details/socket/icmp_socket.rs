use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use pnet_packet::ipv4::Ipv4Packet;
use socket2::{Domain, Protocol, SockAddr, Type};

use super::{Socket, SocketMode};
use crate::IpVersion;

const IPV4_VERSION_NIBBLE: u8 = 4;

/// A socket2 ICMP socket for one IP version, opened in raw or datagram mode.
pub(crate) struct IcmpSocket {
    socket: socket2::Socket,
    version: IpVersion,
    echo_identifier: Option<u16>,
}

impl IcmpSocket {
    pub(crate) fn open(version: IpVersion, mode: SocketMode) -> io::Result<Self> {
        tracing::trace!("opening {mode:?} ICMP socket for {version}");
        let (domain, protocol) = match version {
            IpVersion::V4 => (Domain::IPV4, Protocol::ICMPV4),
            IpVersion::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };
        let socket_type = match mode {
            SocketMode::Raw => Type::RAW,
            SocketMode::Dgram => Type::DGRAM,
        };
        let socket = socket2::Socket::new(domain, socket_type, Some(protocol))?;

        let echo_identifier = match mode {
            SocketMode::Raw => None,
            SocketMode::Dgram => bind_unprivileged(&socket, version)?,
        };

        Ok(IcmpSocket { socket, version, echo_identifier })
    }
}

// Linux ping sockets replace the echo identifier with the socket's local port.
// Binding up front makes the kernel pick that port now so it can be read back.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn bind_unprivileged(socket: &socket2::Socket, version: IpVersion) -> io::Result<Option<u16>> {
    let unspecified = match version {
        IpVersion::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpVersion::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    socket.bind(&SocketAddr::new(unspecified, 0).into())?;
    Ok(socket.local_addr()?.as_socket().map(|addr| addr.port()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn bind_unprivileged(_socket: &socket2::Socket, _version: IpVersion) -> io::Result<Option<u16>> {
    Ok(None)
}

impl Socket for IcmpSocket {
    fn send_to(&self, buf: &[u8], addr: &SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, &SockAddr::from(*addr))
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        // Socket2 guarantees it never writes uninitialised bytes into the buffer, which makes it
        // sound to view an initialised `&mut [u8]` as `&mut [MaybeUninit<u8>]`.
        // https://docs.rs/socket2/0.4.7/socket2/struct.Socket.html#method.recv
        let (n, sock_addr) = self
            .socket
            .recv_from(unsafe { &mut *(std::ptr::addr_of_mut!(*buf) as *mut [MaybeUninit<u8>]) })?;
        let from = sock_addr
            .as_socket()
            .map(|addr| addr.ip())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "received from a non-IP address"))?;

        if self.version == IpVersion::V4 {
            // IPv4 raw sockets (and datagram sockets on some platforms) hand us the IP header too.
            if let Some(header_len) = ipv4_header_len(&buf[..n]) {
                buf.copy_within(header_len..n, 0);
                return Ok((n - header_len, from));
            }
        }
        Ok((n, from))
    }

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.socket.set_read_timeout(Some(timeout))
    }

    fn echo_identifier(&self) -> Option<u16> {
        self.echo_identifier
    }
}

fn ipv4_header_len(buf: &[u8]) -> Option<usize> {
    let first = *buf.first()?;
    if first >> 4 != IPV4_VERSION_NIBBLE {
        return None;
    }
    let packet = Ipv4Packet::new(buf)?;
    let header_len = usize::from(packet.get_header_length()) * 4;
    (header_len <= buf.len()).then_some(header_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_header_is_detected_by_version_nibble() {
        let mut datagram = vec![0x45u8, 0, 0, 28, 0, 0, 0, 0, 64, 1, 0, 0, 127, 0, 0, 1, 127, 0, 0, 1];
        datagram.extend_from_slice(&[0, 0, 0, 0, 0, 1, 0, 1]);
        assert_eq!(Some(20), ipv4_header_len(&datagram));
    }

    #[test]
    fn bare_icmp_message_has_no_ipv4_header() {
        // Echo reply starts with type 0.
        assert_eq!(None, ipv4_header_len(&[0, 0, 0xAB, 0xCD, 0, 1, 0, 1]));
        assert_eq!(None, ipv4_header_len(&[]));
    }

    #[test]
    fn truncated_ipv4_header_is_rejected() {
        assert_eq!(None, ipv4_header_len(&[0x4F, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }
}
