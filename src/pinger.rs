use std::net::IpAddr;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::details::acquirer::{SocketOpener, SystemSocketOpener};
use crate::details::PingLoop;
use crate::{IpVersion, NetworkMode, PingError, PingResult, PingerConfig, ProbeOutcome, SocketMode};

/// Owns the process's ICMP sockets and probes hosts over them.
///
/// Sockets are opened on first use (or by [`Pinger::init`]) exactly once, even when many
/// tasks race to ping concurrently. A failed initialization is remembered: every later
/// call reports the same error (usually [`PingError::NoPingCapability`]) without trying
/// to reopen sockets.
///
/// Share one `Pinger` (e.g. in an `Arc`) between all monitors; only one socket per IP
/// version is useful per process. `ping` must run inside a tokio runtime.
pub struct Pinger {
    config: PingerConfig,
    opener: Box<dyn SocketOpener>,
    ping_loop: OnceCell<PingResult<PingLoop>>,
}

impl Pinger {
    pub fn new(config: PingerConfig) -> Self {
        Self::with_opener(config, Box::new(SystemSocketOpener))
    }

    pub(crate) fn with_opener(config: PingerConfig, opener: Box<dyn SocketOpener>) -> Self {
        Pinger { config, opener, ping_loop: OnceCell::new() }
    }

    /// Opens the sockets now instead of on the first ping.
    pub fn init(&self) -> PingResult<()> {
        self.ping_loop().map(|_| ())
    }

    fn ping_loop(&self) -> PingResult<&PingLoop> {
        self.ping_loop
            .get_or_init(|| {
                let started = PingLoop::start(&*self.opener, &self.config);
                if let Err(e) = &started {
                    tracing::error!("{e}");
                }
                started
            })
            .as_ref()
            .map_err(PingError::replay)
    }

    pub fn supports(&self, version: IpVersion) -> bool {
        self.socket_mode(version).is_some()
    }

    /// How the socket for `version` was opened, `None` if there is none.
    pub fn socket_mode(&self, version: IpVersion) -> Option<SocketMode> {
        let ping_loop = self.ping_loop().ok()?;
        ping_loop.connection(version).map(|connection| connection.mode)
    }

    /// Fails with [`PingError::UnsupportedIpMode`] if this process cannot ping over `mode`.
    pub fn check_network_mode(&self, mode: NetworkMode) -> PingResult<()> {
        let ping_loop = self.ping_loop()?;
        let supported = [IpVersion::V4, IpVersion::V6]
            .into_iter()
            .any(|version| mode.allows(version) && ping_loop.connection(version).is_some());
        if supported {
            Ok(())
        } else {
            Err(PingError::UnsupportedIpMode(mode))
        }
    }

    /// Pings `addr` every `interval` until the first echo reply or until `timeout` elapses.
    ///
    /// Returns the round-trip time of the first answered request together with the number
    /// of requests sent. No reply in time gives a [`crate::TimeoutError`]; a failed send
    /// aborts the probe right away. An `interval` of zero sends a single request.
    pub async fn ping(&self, addr: IpAddr, timeout: Duration, interval: Duration) -> ProbeOutcome {
        match self.ping_loop() {
            Ok(ping_loop) => ping_loop.ping(addr, timeout, interval).await,
            Err(e) => ProbeOutcome::failed(0, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::details::acquirer::tests::OpenerMock;
    use crate::details::socket::tests::OnSend;
    use crate::details::socket::Socket;

    struct SharedOpener(Arc<OpenerMock>);

    impl SocketOpener for SharedOpener {
        fn open(&self, version: IpVersion, mode: SocketMode) -> std::io::Result<Arc<dyn Socket>> {
            self.0.open(version, mode)
        }

        fn supports_unprivileged(&self) -> bool {
            self.0.supports_unprivileged()
        }
    }

    fn pinger(opener: &Arc<OpenerMock>) -> Pinger {
        let config = PingerConfig { read_timeout: Duration::from_millis(10), ..PingerConfig::default() };
        Pinger::with_opener(config, Box::new(SharedOpener(opener.clone())))
    }

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn no_privilege_and_no_fallback_is_fatal() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V4, SocketMode::Dgram)], false, OnSend::Echo));
        let pinger = pinger(&opener);

        assert!(matches!(pinger.init(), Err(PingError::NoPingCapability)));
        let outcome = pinger.ping(localhost(), Duration::from_millis(100), Duration::from_millis(10)).await;
        assert!(matches!(outcome.result, Err(PingError::NoPingCapability)));
        assert_eq!(0, outcome.requests_sent);

        // Nothing opened, so no receive loop either; the failure is not retried.
        assert_eq!(0, opener.opened_sockets());
        assert_eq!(1, opener.open_attempts(IpVersion::V4, SocketMode::Raw));
        assert_eq!(1, opener.open_attempts(IpVersion::V6, SocketMode::Raw));
    }

    #[tokio::test]
    async fn acquisition_runs_once() {
        let opener = Arc::new(OpenerMock::new(
            &[(IpVersion::V4, SocketMode::Raw), (IpVersion::V6, SocketMode::Dgram)],
            true,
            OnSend::Echo,
        ));
        let pinger = pinger(&opener);

        pinger.init().unwrap();
        pinger.init().unwrap();
        for _ in 0..2 {
            let outcome = pinger.ping(localhost(), Duration::from_secs(5), Duration::from_secs(1)).await;
            assert!(outcome.is_up());
        }

        assert_eq!(2, opener.opened_sockets());
        assert_eq!(1, opener.open_attempts(IpVersion::V4, SocketMode::Raw));
        assert_eq!(1, opener.open_attempts(IpVersion::V6, SocketMode::Raw));
        assert_eq!(1, opener.open_attempts(IpVersion::V6, SocketMode::Dgram));
    }

    #[test]
    fn concurrent_first_use_initializes_once() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V4, SocketMode::Raw)], false, OnSend::Echo));
        let pinger = Arc::new(pinger(&opener));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pinger = pinger.clone();
                std::thread::spawn(move || pinger.init().is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(1, opener.opened_sockets());
    }

    #[test]
    fn reports_socket_modes() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V6, SocketMode::Dgram)], true, OnSend::Echo));
        let pinger = pinger(&opener);

        assert_eq!(None, pinger.socket_mode(IpVersion::V4));
        assert_eq!(Some(SocketMode::Dgram), pinger.socket_mode(IpVersion::V6));
        assert!(!pinger.supports(IpVersion::V4));
        assert!(pinger.supports(IpVersion::V6));
    }

    #[test]
    fn network_mode_check() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V4, SocketMode::Raw)], false, OnSend::Echo));
        let pinger = pinger(&opener);

        assert!(pinger.check_network_mode(NetworkMode::Ipv4).is_ok());
        assert!(pinger.check_network_mode(NetworkMode::Any).is_ok());
        assert!(matches!(
            pinger.check_network_mode(NetworkMode::Ipv6),
            Err(PingError::UnsupportedIpMode(NetworkMode::Ipv6))
        ));
    }

    #[tokio::test]
    async fn remembered_init_error_is_reported_unchanged() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V4, SocketMode::Raw)], false, OnSend::Echo));
        let pinger = pinger(&opener);
        assert!(pinger.ping_loop.set(Err(PingError::UnsupportedIpMode(NetworkMode::Ipv4))).is_ok());

        assert!(matches!(pinger.init(), Err(PingError::UnsupportedIpMode(NetworkMode::Ipv4))));
        let outcome = pinger.ping(localhost(), Duration::from_millis(100), Duration::from_millis(10)).await;
        assert!(matches!(outcome.result, Err(PingError::UnsupportedIpMode(NetworkMode::Ipv4))));
        assert_eq!(0, opener.open_attempts(IpVersion::V4, SocketMode::Raw));
    }

    #[tokio::test]
    async fn ping_over_unavailable_version() {
        let opener = Arc::new(OpenerMock::new(&[(IpVersion::V4, SocketMode::Raw)], false, OnSend::Echo));
        let pinger = pinger(&opener);

        let outcome = pinger.ping("::1".parse().unwrap(), Duration::from_secs(1), Duration::from_millis(100)).await;

        assert!(matches!(outcome.result, Err(PingError::NoConnection(IpVersion::V6))));
        opener.socket(IpVersion::V4).should_send_number_of_messages(0);
    }
}
