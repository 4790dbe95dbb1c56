//! Frame classification
//!
//! [`classify`] turns one captured [`Frame`] into one [`Packet`]. Layers are
//! decoded in order (link, network, transport). A layer that is absent or
//! unrecognised leaves its fields at `Unknown`. A layer whose header was
//! announced by the layer below but cannot be decoded marks the packet
//! malformed and stops the walk there.
//!
//! Classification is a pure function of the frame and is safe to call from
//! any number of capture threads at once.

use crate::arp::{ArpError, ArpPacket};
use crate::cooked::{raw_ip_ethertype, NullHeader, SllHeader};
use crate::dns;
use crate::ethernet::{EtherType, EthernetFrame};
use crate::ip::{IpProtocol, Ipv4Packet};
use crate::ipv6::Ipv6Packet;
use crate::sctp::SctpHeader;
use crate::tcp::TcpSegment;
use crate::udp::UdpDatagram;
use packetsleuth_core::{
    well_known_ports, Application, Error, Frame, LinkHint, LinkType, NetworkType, Packet, Result,
    TransportType,
};
use tracing::trace;

/// Layer whose announced header could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayerError(&'static str);

/// Classify a captured frame
///
/// # Errors
///
/// Returns [`Error::Decode`] only when the frame metadata is unusable: an
/// empty capture buffer, or more captured bytes than went over the wire.
pub fn classify(frame: &Frame) -> Result<Packet> {
    if frame.is_empty() {
        return Err(Error::decode(format!(
            "empty capture buffer on {}",
            frame.interface
        )));
    }
    if frame.len() > frame.wire_len {
        return Err(Error::decode(format!(
            "captured length {} exceeds wire length {} on {}",
            frame.len(),
            frame.wire_len,
            frame.interface
        )));
    }

    let mut packet = Packet::unknown(frame.interface.as_str(), frame.timestamp);

    if let Err(LayerError(layer)) = decode_layers(frame, &mut packet) {
        trace!(interface = %frame.interface, layer, "Truncated or invalid header");
        packet.is_malformed = true;
    }
    if packet.transport_type == TransportType::Unknown {
        packet.is_malformed = true;
    }

    Ok(packet)
}

fn decode_layers(frame: &Frame, packet: &mut Packet) -> std::result::Result<(), LayerError> {
    let (ethertype, payload) = decode_link(frame, packet)?;
    if let Some((protocol, payload)) = decode_network(ethertype, payload, packet)? {
        decode_transport(protocol, payload, packet)?;
    }
    Ok(())
}

/// Locate the network layer, recording MAC addresses for Ethernet
fn decode_link<'a>(
    frame: &'a Frame,
    packet: &mut Packet,
) -> std::result::Result<(EtherType, &'a [u8]), LayerError> {
    let data = frame.data.as_slice();

    match frame.link {
        LinkHint::Ethernet => {
            let eth = EthernetFrame::parse(data).ok_or(LayerError("ethernet"))?;
            packet.link_type = LinkType::Ethernet;
            packet.src_mac = Some(eth.source);
            packet.dst_mac = Some(eth.destination);
            Ok((eth.ethertype, eth.payload))
        }
        LinkHint::LinuxSll => {
            let sll = SllHeader::parse(data).ok_or(LayerError("linux_sll"))?;
            Ok((sll.ethertype, sll.payload))
        }
        LinkHint::Null => {
            let null = NullHeader::parse(data).ok_or(LayerError("null"))?;
            Ok((null.ethertype, null.payload))
        }
        LinkHint::Raw => Ok((raw_ip_ethertype(data), data)),
        LinkHint::Other(_) => Ok((EtherType::Custom(0), &data[..0])),
    }
}

/// Decode the network header and return the transport protocol and bytes
///
/// Returns `None` when no transport header follows: ARP, unknown network
/// protocols, and IP fragments after the first.
fn decode_network<'a>(
    ethertype: EtherType,
    payload: &'a [u8],
    packet: &mut Packet,
) -> std::result::Result<Option<(IpProtocol, &'a [u8])>, LayerError> {
    match ethertype {
        EtherType::IPv4 => {
            let ip = Ipv4Packet::parse(payload).map_err(|_| LayerError("ipv4"))?;
            packet.network_type = NetworkType::IPv4;
            packet.src_ip = Some(ip.source.into());
            packet.dst_ip = Some(ip.destination.into());
            if ip.is_trailing_fragment() {
                return Ok(None);
            }
            Ok(Some((ip.protocol, ip.payload)))
        }
        EtherType::IPv6 => {
            let ip = Ipv6Packet::parse(payload).map_err(|_| LayerError("ipv6"))?;
            packet.network_type = NetworkType::IPv6;
            packet.src_ip = Some(ip.source.into());
            packet.dst_ip = Some(ip.destination.into());
            if ip.is_trailing_fragment() {
                return Ok(None);
            }
            Ok(Some((ip.protocol, ip.payload)))
        }
        EtherType::ARP => match ArpPacket::parse(payload) {
            Ok(arp) => {
                packet.network_type = NetworkType::ARP;
                packet.arp_info = Some(arp.info());
                Ok(None)
            }
            Err(ArpError::TruncatedAddresses { .. }) => {
                packet.network_type = NetworkType::ARP;
                Err(LayerError("arp"))
            }
            Err(ArpError::ShortHeader) => Err(LayerError("arp")),
        },
        _ => Ok(None),
    }
}

fn decode_transport(
    protocol: IpProtocol,
    payload: &[u8],
    packet: &mut Packet,
) -> std::result::Result<(), LayerError> {
    match protocol {
        IpProtocol::TCP => {
            let tcp = TcpSegment::parse(payload).ok_or(LayerError("tcp"))?;
            packet.transport_type = TransportType::TCP;
            packet.src_port = tcp.source_port;
            packet.dst_port = tcp.destination_port;
            packet.payload_size = tcp.payload.len();
            packet.is_syn = tcp.flags.syn;
            packet.is_syn_ack = tcp.flags.is_syn_ack();
            if is_http_port(tcp.source_port) || is_http_port(tcp.destination_port) {
                packet.application = Some(Application::HTTP);
            }
        }
        IpProtocol::UDP => {
            let udp = UdpDatagram::parse(payload).ok_or(LayerError("udp"))?;
            packet.transport_type = TransportType::UDP;
            packet.src_port = udp.source_port;
            packet.dst_port = udp.destination_port;
            packet.payload_size = udp.payload.len();
            let dns_port = udp.source_port == well_known_ports::DNS
                || udp.destination_port == well_known_ports::DNS;
            if dns_port && dns::is_well_formed(udp.payload) {
                packet.application = Some(Application::DNS);
            }
        }
        IpProtocol::SCTP => {
            let sctp = SctpHeader::parse(payload).ok_or(LayerError("sctp"))?;
            packet.transport_type = TransportType::SCTP;
            packet.sctp_info = Some(sctp.info());
        }
        _ => {}
    }
    Ok(())
}

fn is_http_port(port: u16) -> bool {
    port == well_known_ports::HTTP || port == well_known_ports::HTTPS
}
