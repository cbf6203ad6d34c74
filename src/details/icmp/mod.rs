use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::time::Instant;

use crate::IpVersion;

mod icmpv4;
mod icmpv6;
mod sequence_number;

pub(crate) use sequence_number::{Identifier, SequenceNumber};

/// Bytes at the start of every payload holding the send time.
pub(crate) const TIMESTAMP_SIZE: usize = 8;

struct EchoFields {
    icmp_type: u8,
    icmp_code: u8,
    identifier: Identifier,
    sequence_number: SequenceNumber,
    data: Vec<u8>,
}

/// One parsed datagram read from an ICMP connection.
#[derive(Debug)]
pub(crate) struct InboundPacket {
    pub version: IpVersion,
    pub received_at: Instant,
    pub from: IpAddr,
    pub icmp_type: u8,
    pub icmp_code: u8,
    pub identifier: Identifier,
    pub sequence_number: SequenceNumber,
    pub data: Vec<u8>,
}

impl InboundPacket {
    pub(crate) fn parse(version: IpVersion, buf: &[u8], from: IpAddr, received_at: Instant) -> Option<Self> {
        let fields = match version {
            IpVersion::V4 => icmpv4::parse(buf),
            IpVersion::V6 => icmpv6::parse(buf),
        }?;
        Some(InboundPacket {
            version,
            received_at,
            from,
            icmp_type: fields.icmp_type,
            icmp_code: fields.icmp_code,
            identifier: fields.identifier,
            sequence_number: fields.sequence_number,
            data: fields.data,
        })
    }

    pub(crate) fn is_echo_reply(&self) -> bool {
        match self.version {
            IpVersion::V4 => icmpv4::is_echo_reply(self.icmp_type),
            IpVersion::V6 => icmpv6::is_echo_reply(self.icmp_type),
        }
    }

    /// Send time the peer echoed back, if the payload carries one.
    pub(crate) fn echoed_send_time(&self) -> Option<u64> {
        let stamp: [u8; TIMESTAMP_SIZE] = self.data.get(..TIMESTAMP_SIZE)?.try_into().ok()?;
        Some(u64::from_be_bytes(stamp))
    }
}

pub(crate) fn encode_echo_request(
    version: IpVersion,
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    match version {
        IpVersion::V4 => icmpv4::encode_echo_request(identifier, sequence_number, payload),
        IpVersion::V6 => icmpv6::encode_echo_request(identifier, sequence_number, payload),
    }
}

#[cfg(test)]
pub(crate) fn encode_echo_reply(
    version: IpVersion,
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    match version {
        IpVersion::V4 => icmpv4::encode_echo(
            pnet_packet::icmp::IcmpTypes::EchoReply,
            identifier,
            sequence_number,
            payload,
        ),
        IpVersion::V6 => icmpv6::encode_echo(
            pnet_packet::icmpv6::Icmpv6Types::EchoReply,
            identifier,
            sequence_number,
            payload,
        ),
    }
}

/// Payload template: a send timestamp followed by a fixed random pattern.
pub(crate) struct EchoPayload {
    pattern: Vec<u8>,
}

impl EchoPayload {
    pub(crate) fn new(size: usize) -> Self {
        let mut pattern = vec![0u8; size.max(TIMESTAMP_SIZE)];
        rand::thread_rng().fill(&mut pattern[TIMESTAMP_SIZE..]);
        EchoPayload { pattern }
    }

    pub(crate) fn stamped(&self, now: SystemTime) -> Vec<u8> {
        let nanos = now.duration_since(UNIX_EPOCH).map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        let mut payload = self.pattern.clone();
        payload[..TIMESTAMP_SIZE].copy_from_slice(&nanos.to_be_bytes());
        payload
    }
}
