use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::time::Instant;

use crate::details::acquirer::Connection;
use crate::details::icmp::InboundPacket;
use crate::details::registry::{CorrelationKey, RequestRegistry};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Dispatch {
    Delivered,
    /// Echo reply without an outstanding request: late, duplicate or foreign.
    Unmatched,
    /// Not an echo reply at all.
    Ignored,
}

/// Routes one parsed datagram to the request waiting for it.
pub(crate) fn dispatch(registry: &RequestRegistry, packet: &InboundPacket) -> Dispatch {
    if !packet.is_echo_reply() {
        return Dispatch::Ignored;
    }
    let key = CorrelationKey {
        addr: packet.from,
        protocol: packet.version.icmp_protocol(),
        identifier: packet.identifier,
        sequence_number: packet.sequence_number,
    };
    match registry.take(&key) {
        None => Dispatch::Unmatched,
        Some(request) => {
            tracing::trace!(
                "echo reply from {} seq {} (sent at {:?} unix ns)",
                packet.from,
                packet.sequence_number.0,
                packet.echoed_send_time()
            );
            // A false return means the probe already finished; that is fine.
            let _ = request.deliver(packet.received_at);
            Dispatch::Delivered
        }
    }
}

/// Starts the receive loop for `connection` on its own thread.
pub(crate) fn spawn(
    connection: &Connection,
    registry: Arc<RequestRegistry>,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    buffer_size: usize,
) -> io::Result<JoinHandle<()>> {
    connection.socket.set_read_timeout(read_timeout)?;
    let connection = connection.clone();
    let name = match connection.version {
        crate::IpVersion::V4 => "icmpv4-recv",
        crate::IpVersion::V6 => "icmpv6-recv",
    };
    std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || receive_loop(&connection, &registry, &stop, buffer_size))
}

fn receive_loop(connection: &Connection, registry: &RequestRegistry, stop: &AtomicBool, buffer_size: usize) {
    tracing::debug!("{} receive loop start ({:?} socket)", connection.version, connection.mode);
    let mut buf = vec![0u8; buffer_size];
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match connection.socket.recv_from(&mut buf) {
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                // Probes on this IP version will time out from now on.
                tracing::error!("error receiving on {} ICMP socket, receive loop stops: {e}", connection.version);
                break;
            }
            Ok((n, from)) => {
                let received_at = Instant::now();
                match InboundPacket::parse(connection.version, &buf[..n], from, received_at) {
                    None => tracing::trace!("discarding {n} byte datagram from {from}: not ICMP"),
                    Some(packet) => {
                        let outcome = dispatch(registry, &packet);
                        if outcome != Dispatch::Delivered {
                            tracing::trace!(
                                "discarding ICMP type {} code {} from {from}: {outcome:?}",
                                packet.icmp_type,
                                packet.icmp_code
                            );
                        }
                    }
                }
            }
        }
    }
    tracing::debug!("{} receive loop end", connection.version);
}
