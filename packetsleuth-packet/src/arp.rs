//! ARP packet structure and parsing
//!
//! Address lengths come from the `hlen`/`plen` header fields, so non-Ethernet
//! hardware and non-IPv4 protocol addresses decode too.

use bytes::{BufMut, BytesMut};
use packetsleuth_core::{ArpInfo, HardwareAddr, MacAddr};
use std::net::{IpAddr, Ipv4Addr};

/// Hardware types
pub const HTYPE_ETHERNET: u16 = 1;

/// Protocol types
pub const PTYPE_IPV4: u16 = 0x0800;

/// ARP Operation Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    /// ARP Request
    Request,
    /// ARP Reply
    Reply,
    /// RARP and anything else
    Other(u16),
}

impl ArpOpcode {
    pub fn from_u16(val: u16) -> Self {
        match val {
            1 => Self::Request,
            2 => Self::Reply,
            other => Self::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::Request => 1,
            Self::Reply => 2,
            Self::Other(val) => val,
        }
    }
}

/// Why an ARP body could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpError {
    /// Fewer bytes than the fixed 8-byte header
    ShortHeader,
    /// Header parsed but the announced addresses run past the buffer
    TruncatedAddresses { needed: usize, available: usize },
}

/// ARP packet with addresses of the lengths its header announces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpPacket {
    /// Hardware type (typically 1 for Ethernet)
    pub htype: u16,
    /// Protocol type (typically 0x0800 for IPv4)
    pub ptype: u16,
    /// Operation
    pub operation: ArpOpcode,
    pub sender_hw_addr: Vec<u8>,
    pub sender_proto_addr: Vec<u8>,
    pub target_hw_addr: Vec<u8>,
    pub target_proto_addr: Vec<u8>,
}

impl ArpPacket {
    /// Fixed part: htype, ptype, hlen, plen, operation
    pub const HEADER_SIZE: usize = 8;

    /// Size of an Ethernet/IPv4 ARP body
    pub const ETHERNET_IPV4_SIZE: usize = 28;

    /// Create new Ethernet/IPv4 ARP request
    pub fn new_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            operation: ArpOpcode::Request,
            sender_hw_addr: sender_mac.as_bytes().to_vec(),
            sender_proto_addr: sender_ip.octets().to_vec(),
            target_hw_addr: MacAddr::zero().as_bytes().to_vec(),
            target_proto_addr: target_ip.octets().to_vec(),
        }
    }

    /// Parse ARP packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self, ArpError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(ArpError::ShortHeader);
        }

        let hlen = data[4] as usize;
        let plen = data[5] as usize;
        let needed = Self::HEADER_SIZE + 2 * (hlen + plen);
        if data.len() < needed {
            return Err(ArpError::TruncatedAddresses {
                needed,
                available: data.len(),
            });
        }

        let mut offset = Self::HEADER_SIZE;
        let mut take = |len: usize| {
            let field = data[offset..offset + len].to_vec();
            offset += len;
            field
        };

        Ok(Self {
            htype: u16::from_be_bytes([data[0], data[1]]),
            ptype: u16::from_be_bytes([data[2], data[3]]),
            operation: ArpOpcode::from_u16(u16::from_be_bytes([data[6], data[7]])),
            sender_hw_addr: take(hlen),
            sender_proto_addr: take(plen),
            target_hw_addr: take(hlen),
            target_proto_addr: take(plen),
        })
    }

    /// Serialize ARP packet to bytes
    ///
    /// `hlen` and `plen` are taken from the sender addresses.
    pub fn serialize(&self) -> Vec<u8> {
        let hlen = self.sender_hw_addr.len();
        let plen = self.sender_proto_addr.len();
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + 2 * (hlen + plen));

        buf.put_u16(self.htype);
        buf.put_u16(self.ptype);
        buf.put_u8(hlen as u8);
        buf.put_u8(plen as u8);
        buf.put_u16(self.operation.to_u16());
        buf.put_slice(&self.sender_hw_addr);
        buf.put_slice(&self.sender_proto_addr);
        buf.put_slice(&self.target_hw_addr);
        buf.put_slice(&self.target_proto_addr);

        buf.to_vec()
    }

    /// Sender/target view used by the packet record
    pub fn info(&self) -> ArpInfo {
        ArpInfo {
            sender_ip: proto_addr(&self.sender_proto_addr),
            sender_mac: HardwareAddr::from_slice(&self.sender_hw_addr),
            target_ip: proto_addr(&self.target_proto_addr),
            target_mac: HardwareAddr::from_slice(&self.target_hw_addr),
        }
    }
}

/// 4-byte addresses are IPv4, 16-byte ones IPv6
fn proto_addr(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        return Some(IpAddr::from(v4));
    }
    <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from)
}
