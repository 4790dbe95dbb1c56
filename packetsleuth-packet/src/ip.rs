//! IPv4 packet parsing
//!
//! This module decodes IPv4 headers and exposes the transport payload,
//! trimmed to the header's total length so Ethernet padding never leaks into
//! the transport layer.

use packetsleuth_core::ip_protocols;
use std::net::Ipv4Addr;

/// IP Protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// ICMPv6 (58)
    ICMPv6,
    /// SCTP (132)
    SCTP,
    /// Custom protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => ip_protocols::TCP,
            IpProtocol::UDP => ip_protocols::UDP,
            IpProtocol::ICMPv6 => 58,
            IpProtocol::SCTP => ip_protocols::SCTP,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            ip_protocols::TCP => IpProtocol::TCP,
            ip_protocols::UDP => IpProtocol::UDP,
            58 => IpProtocol::ICMPv6,
            ip_protocols::SCTP => IpProtocol::SCTP,
            val => IpProtocol::Custom(val),
        }
    }
}

/// Why an IP header could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpError {
    /// Fewer bytes than the fixed header
    Truncated,
    /// Version nibble does not match the parser
    BadVersion(u8),
    /// Header length field smaller than the minimum or beyond the buffer
    BadHeaderLength(usize),
}

/// A decoded IPv4 header with a borrowed payload
#[derive(Debug, Clone)]
pub struct Ipv4Packet<'a> {
    /// Internet Header Length in 32-bit words (minimum 5)
    pub ihl: u8,
    /// Total length (header + data) in bytes
    pub total_length: u16,
    /// Identification
    pub identification: u16,
    /// More-fragments flag
    pub more_fragments: bool,
    /// Fragment offset (in 8-byte blocks)
    pub fragment_offset: u16,
    /// Time to Live
    pub ttl: u8,
    /// Protocol
    pub protocol: IpProtocol,
    /// Source IP address
    pub source: Ipv4Addr,
    /// Destination IP address
    pub destination: Ipv4Addr,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    /// Minimum IPv4 header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse an IPv4 packet from bytes
    pub fn parse(data: &'a [u8]) -> Result<Self, IpError> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return Err(IpError::Truncated);
        }

        let version = data[0] >> 4;
        if version != 4 {
            return Err(IpError::BadVersion(version));
        }

        let ihl = data[0] & 0x0F;
        let header_len = (ihl as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || header_len > data.len() {
            return Err(IpError::BadHeaderLength(header_len));
        }

        let total_length = u16::from_be_bytes([data[2], data[3]]);
        let identification = u16::from_be_bytes([data[4], data[5]]);

        let flags_and_offset = u16::from_be_bytes([data[6], data[7]]);
        let more_fragments = flags_and_offset & 0x2000 != 0;
        let fragment_offset = flags_and_offset & 0x1FFF;

        // A zero total length shows up with TCP segmentation offload; the
        // captured buffer is then the only bound available.
        let end = match total_length as usize {
            0 => data.len(),
            len if len < header_len => return Err(IpError::BadHeaderLength(len)),
            len => len.min(data.len()),
        };

        Ok(Ipv4Packet {
            ihl,
            total_length,
            identification,
            more_fragments,
            fragment_offset,
            ttl: data[8],
            protocol: IpProtocol::from_u8(data[9]),
            source: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            destination: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            payload: &data[header_len..end],
        })
    }

    /// Get the header size in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Whether this datagram is a fragment after the first one
    ///
    /// Only the first fragment carries the transport header.
    pub fn is_trailing_fragment(&self) -> bool {
        self.fragment_offset != 0
    }
}
