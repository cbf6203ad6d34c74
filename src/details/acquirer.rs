use std::io;
use std::sync::Arc;

use crate::details::socket::{IcmpSocket, Socket, SocketMode};
use crate::{IpVersion, PingError, PingResult};

/// Opens ICMP sockets; the seam that lets tests stand in for the operating system.
pub(crate) trait SocketOpener: Send + Sync {
    fn open(&self, version: IpVersion, mode: SocketMode) -> io::Result<Arc<dyn Socket>>;

    /// Whether this platform offers unprivileged ICMP datagram sockets.
    fn supports_unprivileged(&self) -> bool;
}

pub(crate) struct SystemSocketOpener;

impl SocketOpener for SystemSocketOpener {
    fn open(&self, version: IpVersion, mode: SocketMode) -> io::Result<Arc<dyn Socket>> {
        Ok(Arc::new(IcmpSocket::open(version, mode)?))
    }

    fn supports_unprivileged(&self) -> bool {
        cfg!(any(target_os = "linux", target_os = "android", target_os = "macos", target_os = "ios"))
    }
}

/// An open ICMP socket for one IP version.
#[derive(Clone)]
pub(crate) struct Connection {
    pub version: IpVersion,
    pub mode: SocketMode,
    pub socket: Arc<dyn Socket>,
}

/// Opens a connection for `version`: raw first, then the unprivileged fallback.
/// `None` only means this version is unavailable.
pub(crate) fn acquire(opener: &dyn SocketOpener, version: IpVersion, allow_unprivileged: bool) -> Option<Connection> {
    let raw_error = match opener.open(version, SocketMode::Raw) {
        Ok(socket) => return Some(Connection { version, mode: SocketMode::Raw, socket }),
        Err(e) => e,
    };
    tracing::debug!("could not open raw {version} ICMP socket: {raw_error}");

    if !allow_unprivileged || !opener.supports_unprivileged() {
        tracing::warn!("{version} ping unavailable: raw socket failed ({raw_error}) and no unprivileged fallback");
        return None;
    }
    match opener.open(version, SocketMode::Dgram) {
        Ok(socket) => Some(Connection { version, mode: SocketMode::Dgram, socket }),
        Err(e) => {
            tracing::warn!("{version} ping unavailable: raw socket failed ({raw_error}), datagram socket failed ({e})");
            None
        }
    }
}

/// The connections of one process, at most one per IP version.
#[derive(Clone, Default)]
pub(crate) struct Connections {
    v4: Option<Connection>,
    v6: Option<Connection>,
}

impl Connections {
    pub(crate) fn acquire(opener: &dyn SocketOpener, allow_unprivileged: bool) -> PingResult<Self> {
        Self::from_parts(
            acquire(opener, IpVersion::V4, allow_unprivileged),
            acquire(opener, IpVersion::V6, allow_unprivileged),
        )
    }

    pub(crate) fn from_parts(v4: Option<Connection>, v6: Option<Connection>) -> PingResult<Self> {
        if v4.is_none() && v6.is_none() {
            return Err(PingError::NoPingCapability);
        }
        Ok(Connections { v4, v6 })
    }

    pub(crate) fn get(&self, version: IpVersion) -> Option<&Connection> {
        match version {
            IpVersion::V4 => self.v4.as_ref(),
            IpVersion::V6 => self.v6.as_ref(),
        }
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.v4.iter().chain(self.v6.iter())
    }

    /// Keeps only the connections `keep` accepts; fails if none is left.
    pub(crate) fn retain(self, mut keep: impl FnMut(&Connection) -> bool) -> PingResult<Self> {
        Self::from_parts(self.v4.filter(&mut keep), self.v6.filter(&mut keep))
    }
}
