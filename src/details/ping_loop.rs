use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::details::acquirer::{Connection, Connections, SocketOpener};
use crate::details::dispatcher;
use crate::details::icmp::{encode_echo_request, EchoPayload, Identifier, SequenceNumber};
use crate::details::registry::{CorrelationKey, PendingRequest, RequestRegistry};
use crate::{IpVersion, PingError, PingResult, PingerConfig, ProbeOutcome, TimeoutError};

// Tries to find a free identifier/sequence pair before giving up on a send.
const MAX_KEY_ATTEMPTS: usize = 16;

struct Transmitted {
    key: CorrelationKey,
    sent_at: Instant,
    reply_rx: oneshot::Receiver<Instant>,
}

/// Open connections plus the shared request registry their receive loops feed.
pub(crate) struct PingLoop {
    connections: Connections,
    registry: Arc<RequestRegistry>,
    payload: EchoPayload,
    stop: Arc<AtomicBool>,
}

impl Drop for PingLoop {
    fn drop(&mut self) {
        // Receive loops notice at their next read deadline.
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl PingLoop {
    pub(crate) fn new(connections: Connections, payload_size: usize) -> Self {
        PingLoop {
            connections,
            registry: Arc::new(RequestRegistry::new()),
            payload: EchoPayload::new(payload_size),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Acquires the connections and starts one receive loop per connection.
    pub(crate) fn start(opener: &dyn SocketOpener, config: &PingerConfig) -> PingResult<Self> {
        let connections = Connections::acquire(opener, config.allow_unprivileged)?;
        let mut ping_loop = PingLoop::new(connections, config.payload_size);

        let registry = ping_loop.registry.clone();
        let stop = ping_loop.stop.clone();
        let connections = std::mem::take(&mut ping_loop.connections);
        ping_loop.connections = connections.retain(|connection| {
            let spawned = dispatcher::spawn(
                connection,
                registry.clone(),
                stop.clone(),
                config.read_timeout,
                config.receive_buffer_size,
            );
            match spawned {
                Ok(_detached) => {
                    tracing::debug!("{} ping ready on {:?} socket", connection.version, connection.mode);
                    true
                }
                Err(e) => {
                    tracing::error!("could not start {} receive loop: {e}", connection.version);
                    false
                }
            }
        })?;
        Ok(ping_loop)
    }

    pub(crate) fn connection(&self, version: IpVersion) -> Option<&Connection> {
        self.connections.get(version)
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// Sends echo requests to `addr` every `interval` until the first reply or `timeout`.
    /// An `interval` of zero sends a single request.
    pub(crate) async fn ping(&self, addr: IpAddr, timeout: Duration, interval: Duration) -> ProbeOutcome {
        let version = IpVersion::of(&addr);
        let Some(connection) = self.connections.get(version) else {
            return ProbeOutcome::failed(0, PingError::NoConnection(version));
        };

        // Cancels every awaiter of this probe however ping returns, including when dropped.
        let finished = CancellationToken::new();
        let _finish_on_return = finished.clone().drop_guard();
        let (first_reply_tx, mut first_reply_rx) = mpsc::channel::<Duration>(1);

        let deadline = time::sleep(timeout);
        tokio::pin!(deadline);
        // A zero interval or one too far out to schedule means: send once.
        let now = Instant::now();
        let (resend, first_tick, period) = match now.checked_add(interval) {
            Some(first_tick) if !interval.is_zero() => (true, first_tick, interval),
            _ => (false, now + Duration::from_secs(1), Duration::from_secs(1)),
        };
        let mut ticker = time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut requests_sent = 0;
        loop {
            let transmitted = match self.transmit(connection, addr) {
                Ok(transmitted) => transmitted,
                Err(e) => {
                    tracing::debug!("aborting ping to {addr}: {e}");
                    return ProbeOutcome::failed(requests_sent, e);
                }
            };
            requests_sent += 1;
            tokio::spawn(await_reply(transmitted, self.registry.clone(), finished.clone(), first_reply_tx.clone()));

            tokio::select! {
                biased;
                Some(rtt) = first_reply_rx.recv() => {
                    tracing::trace!("ping to {addr}: reply after {rtt:?}, {requests_sent} requests sent");
                    return ProbeOutcome::succeeded(requests_sent, rtt);
                }
                () = &mut deadline => {
                    tracing::trace!(
                        "ping to {addr}: timeout after {requests_sent} requests ({} requests in flight overall)",
                        self.registry.len()
                    );
                    return ProbeOutcome::failed(requests_sent, TimeoutError.into());
                }
                _ = ticker.tick(), if resend => {}
            }
        }
    }

    fn transmit(&self, connection: &Connection, addr: IpAddr) -> PingResult<Transmitted> {
        let payload = self.payload.stamped(SystemTime::now());
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = CorrelationKey {
                addr,
                protocol: connection.version.icmp_protocol(),
                identifier: connection.socket.echo_identifier().map_or_else(Identifier::random, Identifier),
                sequence_number: SequenceNumber::random(),
            };
            let buf = encode_echo_request(connection.version, key.identifier, key.sequence_number, &payload)
                .ok_or_else(|| {
                    transmit_error(addr, io::Error::new(io::ErrorKind::InvalidInput, "could not encode echo request"))
                })?;

            let (request, reply_rx) = PendingRequest::new(key, Instant::now());
            let sent_at = request.sent_at;
            if self.registry.register(request).is_err() {
                continue;
            }
            // Registered before sending so an immediate reply finds its request.
            if let Err(e) = connection.socket.send_to(&buf, &SocketAddr::new(addr, 0)) {
                self.registry.remove(&key);
                return Err(transmit_error(addr, e));
            }
            return Ok(Transmitted { key, sent_at, reply_rx });
        }
        Err(transmit_error(
            addr,
            io::Error::new(io::ErrorKind::AddrInUse, "no free echo identifier/sequence pair"),
        ))
    }
}

fn transmit_error(addr: IpAddr, source: io::Error) -> PingError {
    PingError::Transmit { addr, source }
}

async fn await_reply(
    transmitted: Transmitted,
    registry: Arc<RequestRegistry>,
    finished: CancellationToken,
    first_reply_tx: mpsc::Sender<Duration>,
) {
    let Transmitted { key, sent_at, reply_rx } = transmitted;
    tokio::select! {
        reply = reply_rx => {
            if let Ok(received_at) = reply {
                // Only the first reply of a probe counts; the channel holds one.
                let _ = first_reply_tx.try_send(received_at.saturating_duration_since(sent_at));
            }
        }
        () = finished.cancelled() => registry.remove(&key),
    }
}
