//! TCP segment parsing
//!
//! This module decodes TCP headers and flags. The payload is borrowed from
//! the enclosing IP packet, so its length is the transport payload size the
//! aggregator counts.

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    /// FIN - No more data from sender
    pub fin: bool,
    /// SYN - Synchronize sequence numbers
    pub syn: bool,
    /// RST - Reset the connection
    pub rst: bool,
    /// PSH - Push function
    pub psh: bool,
    /// ACK - Acknowledgment field is significant
    pub ack: bool,
    /// URG - Urgent pointer field is significant
    pub urg: bool,
    /// ECE - ECN-Echo
    pub ece: bool,
    /// CWR - Congestion Window Reduced
    pub cwr: bool,
}

impl TcpFlags {
    /// No flags set
    pub const NONE: TcpFlags = TcpFlags::from_u8(0);

    /// SYN flag (connection initiation)
    pub const SYN: TcpFlags = TcpFlags::from_u8(0b0000_0010);

    /// SYN+ACK flags (connection acknowledgment)
    pub const SYN_ACK: TcpFlags = TcpFlags::from_u8(0b0001_0010);

    /// ACK flag
    pub const ACK: TcpFlags = TcpFlags::from_u8(0b0001_0000);

    /// PSH+ACK flags (push data)
    pub const PSH_ACK: TcpFlags = TcpFlags::from_u8(0b0001_1000);

    /// RST flag (connection reset)
    pub const RST: TcpFlags = TcpFlags::from_u8(0b0000_0100);

    /// Convert flags to u8 value
    pub const fn to_u8(self) -> u8 {
        (self.fin as u8)
            | (self.syn as u8) << 1
            | (self.rst as u8) << 2
            | (self.psh as u8) << 3
            | (self.ack as u8) << 4
            | (self.urg as u8) << 5
            | (self.ece as u8) << 6
            | (self.cwr as u8) << 7
    }

    /// Parse flags from u8 value
    pub const fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: (value & 0b0000_0001) != 0,
            syn: (value & 0b0000_0010) != 0,
            rst: (value & 0b0000_0100) != 0,
            psh: (value & 0b0000_1000) != 0,
            ack: (value & 0b0001_0000) != 0,
            urg: (value & 0b0010_0000) != 0,
            ece: (value & 0b0100_0000) != 0,
            cwr: (value & 0b1000_0000) != 0,
        }
    }

    /// SYN and ACK both set
    pub fn is_syn_ack(self) -> bool {
        self.syn && self.ack
    }
}

/// A decoded TCP header with a borrowed payload
#[derive(Debug, Clone)]
pub struct TcpSegment<'a> {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Sequence number
    pub sequence_number: u32,
    /// Acknowledgment number
    pub acknowledgment_number: u32,
    /// Data offset in 32-bit words (minimum 5)
    pub data_offset: u8,
    /// TCP flags
    pub flags: TcpFlags,
    /// Window size
    pub window_size: u16,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> TcpSegment<'a> {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Parse a TCP segment from bytes
    ///
    /// Returns `None` if the fixed header or the options it announces are
    /// cut short, or if the data offset is below the minimum.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::MIN_HEADER_SIZE {
            return None;
        }

        let data_offset = data[12] >> 4;
        let header_len = (data_offset as usize) * 4;
        if header_len < Self::MIN_HEADER_SIZE || data.len() < header_len {
            return None;
        }

        Some(TcpSegment {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            sequence_number: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            acknowledgment_number: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            data_offset,
            flags: TcpFlags::from_u8(data[13]),
            window_size: u16::from_be_bytes([data[14], data[15]]),
            payload: &data[header_len..],
        })
    }

    /// Get the header size in bytes
    pub fn header_len(&self) -> usize {
        (self.data_offset as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_flags() {
        let flags = TcpFlags::SYN;
        assert!(!flags.fin);
        assert!(flags.syn);
        assert!(!flags.ack);
        assert!(!flags.is_syn_ack());
        assert_eq!(flags.to_u8(), 0b0000_0010);
    }

    #[test]
    fn test_tcp_flags_syn_ack() {
        let flags = TcpFlags::SYN_ACK;
        assert!(flags.is_syn_ack());
        assert!(flags.syn && flags.ack);
        assert_eq!(flags.to_u8(), 0b0001_0010);
        assert_eq!(TcpFlags::from_u8(0xFF).to_u8(), 0xFF);
    }

    #[test]
    fn test_tcp_segment_parse() {
        let data = vec![
            0x30, 0x39, // Source port (12345)
            0x00, 0x50, // Dest port (80)
            0x00, 0x00, 0x03, 0xE8, // Sequence (1000)
            0x00, 0x00, 0x07, 0xD0, // Ack (2000)
            0x50, // Data offset (5) + reserved
            0x02, // Flags (SYN)
            0xFF, 0xFF, // Window (65535)
            0x00, 0x00, // Checksum
            0x00, 0x00, // Urgent pointer
            0x01, 0x02, 0x03, 0x04, // Payload
        ];

        let segment = TcpSegment::parse(&data).unwrap();

        assert_eq!(segment.source_port, 12345);
        assert_eq!(segment.destination_port, 80);
        assert_eq!(segment.sequence_number, 1000);
        assert_eq!(segment.acknowledgment_number, 2000);
        assert_eq!(segment.header_len(), 20);
        assert!(segment.flags.syn);
        assert_eq!(segment.window_size, 65535);
        assert_eq!(segment.payload, &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_tcp_segment_with_options() {
        let mut data = vec![0u8; 24];
        data[12] = 0x60; // 24-byte header
        data[20..24].copy_from_slice(&[0x02, 0x04, 0x05, 0xB4]); // MSS
        data.push(0xEE);

        let segment = TcpSegment::parse(&data).unwrap();
        assert_eq!(segment.header_len(), 24);
        assert_eq!(segment.payload, &[0xEE]);
    }

    #[test]
    fn test_tcp_segment_truncated() {
        assert!(TcpSegment::parse(&[0u8; 19]).is_none());

        let mut options_cut = vec![0u8; 22];
        options_cut[12] = 0x60;
        assert!(TcpSegment::parse(&options_cut).is_none());

        let mut bad_offset = vec![0u8; 20];
        bad_offset[12] = 0x40;
        assert!(TcpSegment::parse(&bad_offset).is_none());
    }
}
