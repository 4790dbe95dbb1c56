//! Ethernet II frame parsing
//!
//! Decodes the 14-byte Ethernet II header and strips any stacked 802.1Q /
//! 802.1ad VLAN tags so that the returned EtherType is the one of the
//! encapsulated network layer.

use packetsleuth_core::{ethertypes, MacAddr};
use std::fmt;

/// EtherType values the classifier dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// IPv6 (0x86DD)
    IPv6,
    /// 802.3 length field (LLC encapsulation)
    LLC,
    /// Any other EtherType
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => ethertypes::IPV4,
            EtherType::ARP => ethertypes::ARP,
            EtherType::IPv6 => ethertypes::IPV6,
            EtherType::LLC => 0,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from u16 value
    ///
    /// Values up to 1500 are 802.3 length fields, not EtherTypes.
    pub fn from_u16(value: u16) -> Self {
        match value {
            ethertypes::IPV4 => EtherType::IPv4,
            ethertypes::ARP => EtherType::ARP,
            ethertypes::IPV6 => EtherType::IPv6,
            0..=1500 => EtherType::LLC,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::LLC => write!(f, "LLC"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// A decoded Ethernet II header with a borrowed payload
#[derive(Debug, Clone)]
pub struct EthernetFrame<'a> {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
    /// EtherType of the innermost payload
    pub ethertype: EtherType,
    /// VLAN identifiers, outermost first
    pub vlans: Vec<u16>,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// Ethernet header size (dst + src + type/length)
    pub const HEADER_SIZE: usize = 14;

    /// Size of one VLAN tag (TCI + inner EtherType)
    pub const VLAN_TAG_SIZE: usize = 4;

    /// Parse an Ethernet frame from bytes
    ///
    /// Returns `None` if the header or one of its VLAN tags is truncated.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let destination = MacAddr::from_slice(&data[0..6])?;
        let source = MacAddr::from_slice(&data[6..12])?;

        let mut type_or_length = u16::from_be_bytes([data[12], data[13]]);
        let mut offset = Self::HEADER_SIZE;
        let mut vlans = Vec::new();

        while type_or_length == ethertypes::DOT1Q || type_or_length == ethertypes::QINQ {
            let tag = data.get(offset..offset + Self::VLAN_TAG_SIZE)?;
            vlans.push(u16::from_be_bytes([tag[0], tag[1]]) & 0x0FFF);
            type_or_length = u16::from_be_bytes([tag[2], tag[3]]);
            offset += Self::VLAN_TAG_SIZE;
        }

        let ethertype = EtherType::from_u16(type_or_length);
        let payload = match ethertype {
            // 802.3 frames carry the payload length; anything after it is padding
            EtherType::LLC => {
                let end = (offset + type_or_length as usize).min(data.len());
                &data[offset..end]
            }
            _ => &data[offset..],
        };

        Some(EthernetFrame {
            destination,
            source,
            ethertype,
            vlans,
            payload,
        })
    }
}
