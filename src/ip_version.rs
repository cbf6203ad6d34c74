use std::fmt;
use std::net::IpAddr;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_ICMPV6: u8 = 58;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// IP protocol number carrying ICMP for this version.
    pub fn icmp_protocol(self) -> u8 {
        match self {
            IpVersion::V4 => IPPROTO_ICMP,
            IpVersion::V6 => IPPROTO_ICMPV6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Which IP families a monitor wants to probe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NetworkMode {
    Ipv4,
    Ipv6,
    Any,
}

impl NetworkMode {
    pub fn allows(self, version: IpVersion) -> bool {
        matches!(
            (self, version),
            (NetworkMode::Any, _) | (NetworkMode::Ipv4, IpVersion::V4) | (NetworkMode::Ipv6, IpVersion::V6)
        )
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkMode::Ipv4 => write!(f, "ip4"),
            NetworkMode::Ipv6 => write!(f, "ip6"),
            NetworkMode::Any => write!(f, "ip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_of_address() {
        assert_eq!(IpVersion::V4, IpVersion::of(&"10.0.0.1".parse().unwrap()));
        assert_eq!(IpVersion::V6, IpVersion::of(&"fe80::1".parse().unwrap()));
    }

    #[test]
    fn icmp_protocol_numbers() {
        assert_eq!(1, IpVersion::V4.icmp_protocol());
        assert_eq!(58, IpVersion::V6.icmp_protocol());
    }

    #[test]
    fn network_mode_allows() {
        assert!(NetworkMode::Any.allows(IpVersion::V6));
        assert!(NetworkMode::Ipv4.allows(IpVersion::V4));
        assert!(!NetworkMode::Ipv4.allows(IpVersion::V6));
        assert!(!NetworkMode::Ipv6.allows(IpVersion::V4));
    }
}
