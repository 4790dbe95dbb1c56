//! Non-Ethernet link headers
//!
//! Linux cooked capture (the `any` device) and BSD null/loopback framing.
//! Neither yields MAC addresses, but both announce which network protocol
//! follows, so the classifier can still decode the IP layer.

use crate::ethernet::EtherType;

/// Linux cooked capture header (DLT_LINUX_SLL)
#[derive(Debug, Clone)]
pub struct SllHeader<'a> {
    /// Packet type (0 = to us, 1 = broadcast, 4 = outgoing, ...)
    pub packet_type: u16,
    /// ARPHRD_ device type
    pub hardware_type: u16,
    /// Link-layer source address, up to 8 bytes
    pub address: &'a [u8],
    /// Protocol of the payload
    pub ethertype: EtherType,
    pub payload: &'a [u8],
}

impl<'a> SllHeader<'a> {
    pub const HEADER_SIZE: usize = 16;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let packet_type = u16::from_be_bytes([data[0], data[1]]);
        let hardware_type = u16::from_be_bytes([data[2], data[3]]);
        let address_len = (u16::from_be_bytes([data[4], data[5]]) as usize).min(8);
        let protocol = u16::from_be_bytes([data[14], data[15]]);

        Some(SllHeader {
            packet_type,
            hardware_type,
            address: &data[6..6 + address_len],
            ethertype: EtherType::from_u16(protocol),
            payload: &data[Self::HEADER_SIZE..],
        })
    }
}

/// BSD loopback header (DLT_NULL / DLT_LOOP)
#[derive(Debug, Clone)]
pub struct NullHeader<'a> {
    /// Address family, normalised to IPv4/IPv6 where recognised
    pub ethertype: EtherType,
    pub payload: &'a [u8],
}

const AF_INET: u32 = 2;
// Linux, NetBSD/OpenBSD, FreeBSD and Darwin disagree on AF_INET6.
const AF_INET6: [u32; 4] = [10, 24, 28, 30];

impl<'a> NullHeader<'a> {
    pub const HEADER_SIZE: usize = 4;

    /// The family field is host byte order for DLT_NULL and network order
    /// for DLT_LOOP, so both readings are tried.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let family: [u8; 4] = data.get(..Self::HEADER_SIZE)?.try_into().ok()?;

        let ethertype = [u32::from_le_bytes(family), u32::from_be_bytes(family)]
            .into_iter()
            .find_map(|f| {
                if f == AF_INET {
                    Some(EtherType::IPv4)
                } else if AF_INET6.contains(&f) {
                    Some(EtherType::IPv6)
                } else {
                    None
                }
            })
            .unwrap_or(EtherType::Custom(0));

        Some(NullHeader {
            ethertype,
            payload: &data[Self::HEADER_SIZE..],
        })
    }
}

/// Guess the network protocol of a raw IP capture from the version nibble
pub fn raw_ip_ethertype(data: &[u8]) -> EtherType {
    match data.first().map(|b| b >> 4) {
        Some(4) => EtherType::IPv4,
        Some(6) => EtherType::IPv6,
        _ => EtherType::Custom(0),
    }
}
