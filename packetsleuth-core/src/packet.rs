//! Classified packet record

use std::net::IpAddr;
use std::time::SystemTime;

use crate::types::{Application, HardwareAddr, LinkType, MacAddr, NetworkType, TransportType};

/// ARP sender/target addresses
///
/// Protocol addresses are `None` unless they are 4 or 16 bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpInfo {
    pub sender_ip: Option<IpAddr>,
    pub sender_mac: HardwareAddr,
    pub target_ip: Option<IpAddr>,
    pub target_mac: HardwareAddr,
}

/// SCTP common header port pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SctpInfo {
    pub src_port: u16,
    pub dst_port: u16,
}

/// The classified record produced once per captured frame
///
/// Built by the classifier and only ever read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// When the frame was captured
    pub timestamp: SystemTime,
    /// Interface the frame was captured on
    pub interface: String,
    pub link_type: LinkType,
    pub src_mac: Option<MacAddr>,
    pub dst_mac: Option<MacAddr>,
    pub network_type: NetworkType,
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub transport_type: TransportType,
    /// TCP/UDP source port, 0 otherwise
    pub src_port: u16,
    /// TCP/UDP destination port, 0 otherwise
    pub dst_port: u16,
    /// Transport payload length in bytes
    pub payload_size: usize,
    pub application: Option<Application>,
    pub is_malformed: bool,
    pub arp_info: Option<ArpInfo>,
    pub sctp_info: Option<SctpInfo>,
    pub is_syn: bool,
    pub is_syn_ack: bool,
}

impl Packet {
    /// An empty record with every layer unknown
    pub fn unknown(interface: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            interface: interface.into(),
            link_type: LinkType::Unknown,
            src_mac: None,
            dst_mac: None,
            network_type: NetworkType::Unknown,
            src_ip: None,
            dst_ip: None,
            transport_type: TransportType::Unknown,
            src_port: 0,
            dst_port: 0,
            payload_size: 0,
            application: None,
            is_malformed: false,
            arp_info: None,
            sctp_info: None,
            is_syn: false,
            is_syn_ack: false,
        }
    }

    /// Port pair used for port histograms
    ///
    /// TCP and UDP use the top-level ports, SCTP its nested pair. Any other
    /// transport has no ports.
    pub fn histogram_ports(&self) -> Option<(u16, u16)> {
        match self.transport_type {
            TransportType::TCP | TransportType::UDP => Some((self.src_port, self.dst_port)),
            _ => self.sctp_info.map(|s| (s.src_port, s.dst_port)),
        }
    }

    /// Source and destination address when an IP header was decoded
    pub fn ip_pair(&self) -> Option<(IpAddr, IpAddr)> {
        if !self.network_type.is_ip() {
            return None;
        }
        Some((self.src_ip?, self.dst_ip?))
    }
}
