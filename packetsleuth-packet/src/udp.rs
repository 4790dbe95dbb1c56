//! UDP datagram parsing

/// A decoded UDP header with a borrowed payload
#[derive(Debug, Clone)]
pub struct UdpDatagram<'a> {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Length (header + data)
    pub length: u16,
    /// Checksum
    pub checksum: u16,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> UdpDatagram<'a> {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Parse a UDP datagram from bytes
    ///
    /// A length field of zero (jumbograms, offloaded checksums) means the
    /// payload runs to the end of the buffer. A nonzero length shorter than
    /// the header is rejected.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        let length = u16::from_be_bytes([data[4], data[5]]);
        let end = match length as usize {
            0 => data.len(),
            len if len < Self::HEADER_SIZE => return None,
            len => len.min(data.len()),
        };

        Some(UdpDatagram {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            length,
            checksum: u16::from_be_bytes([data[6], data[7]]),
            payload: &data[Self::HEADER_SIZE..end],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_datagram_parse() {
        let data = vec![
            0x30, 0x39, // Source port (12345)
            0x00, 0x35, // Dest port (53)
            0x00, 0x0C, // Length (12)
            0x12, 0x34, // Checksum
            0x01, 0x02, 0x03, 0x04, // Payload
        ];

        let datagram = UdpDatagram::parse(&data).unwrap();

        assert_eq!(datagram.source_port, 12345);
        assert_eq!(datagram.destination_port, 53);
        assert_eq!(datagram.length, 12);
        assert_eq!(datagram.checksum, 0x1234);
        assert_eq!(datagram.payload, &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_udp_length_bounds_payload() {
        let data = vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x09, 0x00, 0x00, 0xAA, 0xBB];
        assert_eq!(UdpDatagram::parse(&data).unwrap().payload, &[0xAA]);

        // Length past the buffer is clamped to what was captured
        let data = vec![0x00, 0x01, 0x00, 0x02, 0x05, 0xDC, 0x00, 0x00, 0xAA];
        assert_eq!(UdpDatagram::parse(&data).unwrap().payload, &[0xAA]);
    }

    #[test]
    fn test_udp_zero_length_uses_buffer() {
        let data = vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        assert_eq!(UdpDatagram::parse(&data).unwrap().payload.len(), 2);
    }

    #[test]
    fn test_udp_invalid() {
        assert!(UdpDatagram::parse(&[0x00, 0x35, 0x00, 0x35, 0x00]).is_none());

        let bad_length = vec![0x00, 0x01, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00];
        assert!(UdpDatagram::parse(&bad_length).is_none());
    }
}
