use pnet_packet::icmp::{
    checksum,
    echo_reply::EchoReplyPacket,
    echo_request::{EchoRequestPacket, MutableEchoRequestPacket},
    IcmpCode, IcmpPacket, IcmpType, IcmpTypes,
};
use pnet_packet::{Packet, PrimitiveValues};

use super::{EchoFields, Identifier, SequenceNumber};

pub(super) fn encode_echo(
    icmp_type: IcmpType,
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    // Echo request and echo reply share one layout.
    let buf = vec![0u8; EchoRequestPacket::minimum_packet_size() + payload.len()];
    let mut package = MutableEchoRequestPacket::owned(buf)?;
    package.set_icmp_type(icmp_type);
    package.set_icmp_code(IcmpCode::new(0));
    package.set_identifier(identifier.into());
    package.set_sequence_number(sequence_number.into());
    package.set_payload(payload);

    package.set_checksum(0_u16);
    let checksum = checksum(&IcmpPacket::new(package.packet())?);
    package.set_checksum(checksum);
    Some(package.packet().to_vec())
}

pub(super) fn encode_echo_request(
    identifier: Identifier,
    sequence_number: SequenceNumber,
    payload: &[u8],
) -> Option<Vec<u8>> {
    encode_echo(IcmpTypes::EchoRequest, identifier, sequence_number, payload)
}

pub(super) fn parse(buf: &[u8]) -> Option<EchoFields> {
    let header = IcmpPacket::new(buf)?;
    let echo = EchoReplyPacket::new(buf)?;
    Some(EchoFields {
        icmp_type: header.get_icmp_type().to_primitive_values().0,
        icmp_code: header.get_icmp_code().to_primitive_values().0,
        identifier: echo.get_identifier().into(),
        sequence_number: echo.get_sequence_number().into(),
        data: echo.payload().to_vec(),
    })
}

pub(super) fn is_echo_reply(icmp_type: u8) -> bool {
    icmp_type == IcmpTypes::EchoReply.to_primitive_values().0
}
