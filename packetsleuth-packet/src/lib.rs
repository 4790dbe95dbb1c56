//! Header decoders and frame classification for PacketSleuth
//!
//! This crate turns raw captured frames into [`Packet`] records. Each header
//! decoder borrows from the frame buffer and returns `None` (or an error for
//! IP) when its header is cut short. The [`classify`] function chains them in
//! layer order:
//!
//! - **Link**: Ethernet II with 802.1Q/802.1ad tags, Linux cooked capture,
//!   BSD null/loopback, raw IP
//! - **Network**: IPv4, IPv6 with extension headers, ARP
//! - **Transport**: TCP, UDP, SCTP
//! - **Application**: HTTP by port, DNS by port plus a well-formedness check
//!
//! # Architecture
//!
//! - [`classify`] - Ordered layer walk producing one record per frame
//! - [`ethernet`] - Ethernet II and VLAN tag parsing
//! - [`cooked`] - Linux SLL and BSD null headers
//! - [`ip`] - IPv4 header parsing
//! - [`ipv6`] - IPv6 header and extension chain parsing
//! - [`arp`] - Ethernet/IPv4 ARP
//! - [`tcp`], [`udp`], [`sctp`] - Transport headers
//! - [`dns`] - DNS message validation
//! - [`builder`] - Synthetic frames for tests and fixtures
//!
//! # Quick Start
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use packetsleuth_core::{Application, TransportType};
//! use packetsleuth_packet::{classify, FrameBuilder, TcpFlags};
//!
//! let frame = FrameBuilder::new()
//!     .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
//!     .tcp(1234, 80, TcpFlags::SYN)
//!     .payload(vec![0; 100])
//!     .frame("eth0")
//!     .unwrap();
//!
//! let packet = classify(&frame).unwrap();
//! assert_eq!(packet.transport_type, TransportType::TCP);
//! assert_eq!(packet.application, Some(Application::HTTP));
//! assert_eq!(packet.payload_size, 100);
//! assert!(packet.is_syn);
//! ```
//!
//! [`Packet`]: packetsleuth_core::Packet

pub mod arp;
pub mod builder;
pub mod classify;
pub mod cooked;
pub mod dns;
pub mod ethernet;
pub mod ip;
pub mod ipv6;
pub mod sctp;
pub mod tcp;
pub mod udp;

// Re-export commonly used types for convenience
pub use arp::{ArpOpcode, ArpPacket};
pub use builder::FrameBuilder;
pub use classify::classify;
pub use ethernet::{EtherType, EthernetFrame};
pub use ip::{IpError, IpProtocol, Ipv4Packet};
pub use ipv6::Ipv6Packet;
pub use sctp::SctpHeader;
pub use tcp::{TcpFlags, TcpSegment};
pub use udp::UdpDatagram;
