//! Synthetic frame builder
//!
//! Assembles wire-format frames layer by layer, innermost first, the way a
//! capture handle would deliver them. Checksums are left zero since the
//! classifier never verifies them. Used by tests and by the pipeline
//! fixtures in the other crates.

use crate::arp::ArpPacket;
use crate::ethernet::EthernetFrame;
use crate::tcp::TcpFlags;
use bytes::{BufMut, BytesMut};
use packetsleuth_core::{ethertypes, ip_protocols, Error, Frame, LinkHint, MacAddr, Result};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Minimum Ethernet frame size without FCS
const MIN_ETHERNET_FRAME: usize = 60;

/// Layer 2 framing
#[derive(Debug, Clone)]
enum Layer2 {
    Ethernet {
        src: MacAddr,
        dst: MacAddr,
        vlans: Vec<u16>,
        pad: bool,
    },
    Raw,
}

/// Layer 3 packet type
#[derive(Debug, Clone)]
enum Layer3 {
    Ipv4 {
        src: Ipv4Addr,
        dst: Ipv4Addr,
        ttl: u8,
        fragment_offset: u16,
    },
    Ipv6 {
        src: Ipv6Addr,
        dst: Ipv6Addr,
        hop_limit: u8,
    },
    Arp(ArpPacket),
    Other(u16),
}

/// Layer 4 segment/datagram type
#[derive(Debug, Clone, Copy)]
enum Layer4 {
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
    },
    Sctp {
        src_port: u16,
        dst_port: u16,
    },
    /// Bare IP protocol number with no transport header
    Protocol(u8),
}

/// Frame builder with fluent API
///
/// ```
/// use std::net::Ipv4Addr;
/// use packetsleuth_packet::{FrameBuilder, TcpFlags};
///
/// let frame = FrameBuilder::new()
///     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
///     .tcp(1234, 80, TcpFlags::SYN)
///     .payload(vec![0; 100])
///     .frame("eth0")
///     .unwrap();
/// assert_eq!(frame.len(), 14 + 20 + 20 + 100);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    layer2: Layer2,
    layer3: Option<Layer3>,
    layer4: Option<Layer4>,
    payload: Vec<u8>,
}

impl FrameBuilder {
    /// Ethernet framing between two locally administered addresses
    pub fn new() -> Self {
        FrameBuilder {
            layer2: Layer2::Ethernet {
                src: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
                dst: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]),
                vlans: Vec::new(),
                pad: true,
            },
            layer3: None,
            layer4: None,
            payload: Vec::new(),
        }
    }

    /// Replace the Ethernet addresses
    pub fn ethernet(mut self, src: MacAddr, dst: MacAddr) -> Self {
        if let Layer2::Ethernet {
            src: s, dst: d, ..
        } = &mut self.layer2
        {
            *s = src;
            *d = dst;
        } else {
            self.layer2 = Layer2::Ethernet {
                src,
                dst,
                vlans: Vec::new(),
                pad: true,
            };
        }
        self
    }

    /// Push an 802.1Q tag (outermost first)
    pub fn vlan(mut self, id: u16) -> Self {
        if let Layer2::Ethernet { vlans, .. } = &mut self.layer2 {
            vlans.push(id & 0x0FFF);
        }
        self
    }

    /// Skip padding short frames to the Ethernet minimum
    pub fn unpadded(mut self) -> Self {
        if let Layer2::Ethernet { pad, .. } = &mut self.layer2 {
            *pad = false;
        }
        self
    }

    /// Emit the network layer with no link header (DLT_RAW)
    pub fn raw_ip(mut self) -> Self {
        self.layer2 = Layer2::Raw;
        self
    }

    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv4 {
            src,
            dst,
            ttl: 64,
            fragment_offset: 0,
        });
        self
    }

    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.layer3 = Some(Layer3::Ipv6 {
            src,
            dst,
            hop_limit: 64,
        });
        self
    }

    /// Mark an IPv4 datagram as a non-first fragment (offset in 8-byte blocks)
    pub fn fragment_offset(mut self, offset: u16) -> Self {
        if let Some(Layer3::Ipv4 {
            fragment_offset, ..
        }) = &mut self.layer3
        {
            *fragment_offset = offset & 0x1FFF;
        }
        self
    }

    pub fn arp(mut self, arp: ArpPacket) -> Self {
        self.layer3 = Some(Layer3::Arp(arp));
        self
    }

    /// Arbitrary EtherType with the payload as its body
    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.layer3 = Some(Layer3::Other(ethertype));
        self
    }

    pub fn tcp(mut self, src_port: u16, dst_port: u16, flags: TcpFlags) -> Self {
        self.layer4 = Some(Layer4::Tcp {
            src_port,
            dst_port,
            seq: 1000,
            ack: if flags.ack { 1 } else { 0 },
            flags,
        });
        self
    }

    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Udp { src_port, dst_port });
        self
    }

    pub fn sctp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Sctp { src_port, dst_port });
        self
    }

    /// Set the IP protocol number without emitting a transport header
    pub fn ip_protocol(mut self, protocol: u8) -> Self {
        self.layer4 = Some(Layer4::Protocol(protocol));
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the frame bytes
    ///
    /// # Errors
    ///
    /// Returns an error if a transport layer is set without an IP layer.
    pub fn build(self) -> Result<Vec<u8>> {
        let mut data = self.payload;

        let protocol = match self.layer4 {
            Some(layer4) => {
                if !matches!(self.layer3, Some(Layer3::Ipv4 { .. } | Layer3::Ipv6 { .. })) {
                    return Err(Error::PacketConstruction(
                        "Layer 4 requires an IP layer".into(),
                    ));
                }
                let (protocol, segment) = transport_bytes(layer4, &data);
                data = segment;
                protocol
            }
            None => 59, // No Next Header
        };

        let ethertype = match &self.layer3 {
            Some(Layer3::Ipv4 {
                src,
                dst,
                ttl,
                fragment_offset,
            }) => {
                data = ipv4_bytes(*src, *dst, *ttl, *fragment_offset, protocol, &data)?;
                ethertypes::IPV4
            }
            Some(Layer3::Ipv6 {
                src,
                dst,
                hop_limit,
            }) => {
                data = ipv6_bytes(*src, *dst, *hop_limit, protocol, &data)?;
                ethertypes::IPV6
            }
            Some(Layer3::Arp(arp)) => {
                data = arp.serialize();
                ethertypes::ARP
            }
            Some(Layer3::Other(ethertype)) => *ethertype,
            None => ethertypes::IPV4,
        };

        match self.layer2 {
            Layer2::Raw => Ok(data),
            Layer2::Ethernet {
                src,
                dst,
                vlans,
                pad,
            } => {
                let header_len =
                    EthernetFrame::HEADER_SIZE + vlans.len() * EthernetFrame::VLAN_TAG_SIZE;
                let mut buf = BytesMut::with_capacity(header_len + data.len());

                buf.put_slice(dst.as_bytes());
                buf.put_slice(src.as_bytes());
                for vlan in &vlans {
                    buf.put_u16(ethertypes::DOT1Q);
                    buf.put_u16(*vlan);
                }
                buf.put_u16(ethertype);
                buf.put_slice(&data);

                if pad && buf.len() < MIN_ETHERNET_FRAME {
                    buf.put_bytes(0, MIN_ETHERNET_FRAME - buf.len());
                }

                Ok(buf.to_vec())
            }
        }
    }

    /// Build a captured frame tagged with the interface name
    pub fn frame(self, interface: &str) -> Result<Frame> {
        let link = match self.layer2 {
            Layer2::Ethernet { .. } => LinkHint::Ethernet,
            Layer2::Raw => LinkHint::Raw,
        };
        Ok(Frame::new(interface, link, self.build()?))
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_bytes(layer4: Layer4, payload: &[u8]) -> (u8, Vec<u8>) {
    let mut buf = BytesMut::with_capacity(20 + payload.len());

    let protocol = match layer4 {
        Layer4::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
        } => {
            buf.put_u16(src_port);
            buf.put_u16(dst_port);
            buf.put_u32(seq);
            buf.put_u32(ack);
            buf.put_u8(5 << 4); // data offset
            buf.put_u8(flags.to_u8());
            buf.put_u16(65535); // window
            buf.put_u16(0); // checksum
            buf.put_u16(0); // urgent pointer
            ip_protocols::TCP
        }
        Layer4::Udp { src_port, dst_port } => {
            buf.put_u16(src_port);
            buf.put_u16(dst_port);
            buf.put_u16((8 + payload.len()) as u16);
            buf.put_u16(0);
            ip_protocols::UDP
        }
        Layer4::Sctp { src_port, dst_port } => {
            buf.put_u16(src_port);
            buf.put_u16(dst_port);
            buf.put_u32(0x0000_0001); // verification tag
            buf.put_u32(0); // CRC32c
            ip_protocols::SCTP
        }
        Layer4::Protocol(protocol) => protocol,
    };

    buf.put_slice(payload);
    (protocol, buf.to_vec())
}

fn ipv4_bytes(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    fragment_offset: u16,
    protocol: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let total_length = u16::try_from(20 + payload.len())
        .map_err(|_| Error::PacketConstruction("IPv4 payload too large".into()))?;

    let mut buf = BytesMut::with_capacity(total_length as usize);
    buf.put_u8(0x45);
    buf.put_u8(0);
    buf.put_u16(total_length);
    buf.put_u16(0x1234);
    buf.put_u16(fragment_offset);
    buf.put_u8(ttl);
    buf.put_u8(protocol);
    buf.put_u16(0);
    buf.put_slice(&src.octets());
    buf.put_slice(&dst.octets());
    buf.put_slice(payload);
    Ok(buf.to_vec())
}

fn ipv6_bytes(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    hop_limit: u8,
    next_header: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let payload_length = u16::try_from(payload.len())
        .map_err(|_| Error::PacketConstruction("IPv6 payload too large".into()))?;

    let mut buf = BytesMut::with_capacity(40 + payload.len());
    buf.put_u32(0x6000_0000);
    buf.put_u16(payload_length);
    buf.put_u8(next_header);
    buf.put_u8(hop_limit);
    buf.put_slice(&src.octets());
    buf.put_slice(&dst.octets());
    buf.put_slice(payload);
    Ok(buf.to_vec())
}
