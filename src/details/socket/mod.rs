use std::net::{IpAddr, SocketAddr};
use std::{io, time::Duration};

pub(crate) mod icmp_socket;

pub(crate) use icmp_socket::IcmpSocket;

/// How an ICMP connection was opened.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum SocketMode {
    /// Raw ICMP socket, needs `CAP_NET_RAW` or root.
    Raw,
    /// Unprivileged ICMP datagram ("ping") socket.
    Dgram,
}

pub(crate) trait Socket: Send + Sync {
    fn send_to(&self, buf: &[u8], addr: &SocketAddr) -> io::Result<usize>;

    /// Reads one ICMP message (without IP header) and returns its length and sender.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)>;

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()>;

    /// Identifier the kernel stamps on outgoing echo requests, if it rewrites it.
    fn echo_identifier(&self) -> Option<u16> {
        None
    }
}
