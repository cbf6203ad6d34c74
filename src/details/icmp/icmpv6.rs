use pnet_packet::icmpv6::{Icmpv6Code, Icmpv6Packet, Icmpv6Type, Icmpv6Types, MutableIcmpv6Packet};
use pnet_packet::{Packet, PrimitiveValues};

use super::{EchoFields, Identifier, SequenceNumber};

const ECHO_FIELDS_SIZE: usize = 4;

pub(super) fn encode_echo(
    icmpv6_type: Icmpv6Type,
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    let mut body = Vec::with_capacity(ECHO_FIELDS_SIZE + payload.len());
    body.extend_from_slice(&u16::from(identifier).to_be_bytes());
    body.extend_from_slice(&u16::from(sequence_number).to_be_bytes());
    body.extend_from_slice(payload);

    let buf = vec![0u8; Icmpv6Packet::minimum_packet_size() + body.len()];
    let mut package = MutableIcmpv6Packet::owned(buf)?;
    package.set_icmpv6_type(icmpv6_type);
    package.set_icmpv6_code(Icmpv6Code::new(0));
    // The ICMPv6 checksum covers an IPv6 pseudo header; the kernel fills it in.
    package.set_checksum(0_u16);
    package.set_payload(&body);
    Some(package.packet().to_vec())
}

pub(super) fn encode_echo_request(
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    encode_echo(Icmpv6Types::EchoRequest, identifier, sequence_number, payload)
}

pub(super) fn parse(buf: &[u8]) -> Option<EchoFields> {
    let package = Icmpv6Packet::new(buf)?;
    let body = package.payload();
    if body.len() < ECHO_FIELDS_SIZE {
        return None;
    }
    Some(EchoFields {
        icmp_type: package.get_icmpv6_type().to_primitive_values().0,
        icmp_code: package.get_icmpv6_code().to_primitive_values().0,
        identifier: u16::from_be_bytes([body[0], body[1]]).into(),
        sequence_number: u16::from_be_bytes([body[2], body[3]]).into(),
        data: body[ECHO_FIELDS_SIZE..].to_vec(),
    })
}

pub(super) fn is_echo_reply(icmp_type: u8) -> bool {
    icmp_type == Icmpv6Types::EchoReply.to_primitive_values().0
}
