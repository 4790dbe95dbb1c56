//! IPv6 packet parsing

use crate::ip::{IpError, IpProtocol};
use packetsleuth_core::ip_protocols;
use std::net::Ipv6Addr;

/// Authentication header, walked like the other extension headers
const IPV6_AUTH: u8 = 51;

/// A decoded IPv6 header with extension headers skipped
#[derive(Debug, Clone)]
pub struct Ipv6Packet<'a> {
    /// Payload length from the fixed header
    pub payload_length: u16,
    /// Protocol of the payload after all extension headers
    pub protocol: IpProtocol,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    /// Fragment offset if a fragment header was present
    pub fragment_offset: Option<u16>,
    /// Upper-layer payload
    pub payload: &'a [u8],
}

impl<'a> Ipv6Packet<'a> {
    pub const HEADER_SIZE: usize = 40;

    /// Upper bound on walked extension headers
    const MAX_EXTENSIONS: usize = 8;

    pub fn parse(data: &'a [u8]) -> Result<Self, IpError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(IpError::Truncated);
        }

        let version = data[0] >> 4;
        if version != 6 {
            return Err(IpError::BadVersion(version));
        }

        let payload_length = u16::from_be_bytes([data[4], data[5]]);
        let mut next_header = data[6];
        let hop_limit = data[7];

        let mut src = [0u8; 16];
        src.copy_from_slice(&data[8..24]);
        let mut dst = [0u8; 16];
        dst.copy_from_slice(&data[24..40]);

        // Zero payload length means a jumbogram or TSO; trust the buffer.
        let end = match payload_length as usize {
            0 => data.len(),
            len => (Self::HEADER_SIZE + len).min(data.len()),
        };
        let mut rest = &data[Self::HEADER_SIZE..end];
        let mut fragment_offset = None;

        for _ in 0..Self::MAX_EXTENSIONS {
            let ext_len = match next_header {
                ip_protocols::HOP_BY_HOP
                | ip_protocols::IPV6_ROUTING
                | ip_protocols::IPV6_DEST_OPTS => {
                    let len = *rest.get(1).ok_or(IpError::Truncated)?;
                    (len as usize + 1) * 8
                }
                ip_protocols::IPV6_FRAGMENT => {
                    let field = rest.get(2..4).ok_or(IpError::Truncated)?;
                    fragment_offset = Some(u16::from_be_bytes([field[0], field[1]]) >> 3);
                    8
                }
                IPV6_AUTH => {
                    let len = *rest.get(1).ok_or(IpError::Truncated)?;
                    (len as usize + 2) * 4
                }
                _ => break,
            };

            if rest.len() < ext_len {
                return Err(IpError::Truncated);
            }
            next_header = rest[0];
            rest = &rest[ext_len..];
        }

        Ok(Ipv6Packet {
            payload_length,
            protocol: IpProtocol::from_u8(next_header),
            hop_limit,
            source: Ipv6Addr::from(src),
            destination: Ipv6Addr::from(dst),
            fragment_offset,
            payload: rest,
        })
    }

    /// Whether this datagram is a fragment after the first one
    pub fn is_trailing_fragment(&self) -> bool {
        matches!(self.fragment_offset, Some(offset) if offset != 0)
    }
}
