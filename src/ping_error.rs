use std::{fmt, io, net::IpAddr};

use thiserror::Error;

use crate::{IpVersion, NetworkMode};

pub type PingResult<T> = std::result::Result<T, PingError>;

#[derive(Debug, Error)]
pub enum PingError {
    /// Neither an IPv4 nor an IPv6 ICMP socket could be opened.
    #[error(
        "no ping capability: could not open an ICMP socket for IPv4 or IPv6. \
         Either grant the executable the raw socket capability \
         (e.g. `setcap cap_net_raw+eip <executable>`, or run it as root), \
         or allow unprivileged ping for this user's group \
         (e.g. `sysctl -w net.ipv4.ping_group_range=\"0 2147483647\"`)"
    )]
    NoPingCapability,

    #[error("unsupported IP mode {0}: this process cannot ping over it")]
    UnsupportedIpMode(NetworkMode),

    #[error("no connection available for {0}")]
    NoConnection(IpVersion),

    #[error("could not send echo request to {addr}")]
    Transmit {
        addr: IpAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl PingError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PingError::Timeout(e) if e.is_timeout())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, PingError::Timeout(e) if e.is_temporary())
    }

    /// An owned copy for reporting a remembered error again. An I/O source keeps its kind and message.
    pub(crate) fn replay(&self) -> PingError {
        match self {
            PingError::NoPingCapability => PingError::NoPingCapability,
            PingError::UnsupportedIpMode(mode) => PingError::UnsupportedIpMode(*mode),
            PingError::NoConnection(version) => PingError::NoConnection(*version),
            PingError::Transmit { addr, source } => PingError::Transmit {
                addr: *addr,
                source: io::Error::new(source.kind(), source.to_string()),
            },
            PingError::Timeout(e) => PingError::Timeout(*e),
        }
    }
}

/// Returned when no echo reply arrived before the probe's timeout. This is an
/// expected outcome for an unreachable host, not a malfunction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeoutError;

impl TimeoutError {
    pub fn is_timeout(self) -> bool {
        true
    }

    pub fn is_temporary(self) -> bool {
        true
    }
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ping timeout")
    }
}

impl std::error::Error for TimeoutError {}
