//! SCTP common header parsing
//!
//! Only the 12-byte common header is decoded. Chunks are not walked, so the
//! classifier reports no payload size for SCTP.

use packetsleuth_core::SctpInfo;

#[derive(Debug, Clone)]
pub struct SctpHeader<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub verification_tag: u32,
    pub checksum: u32,
    /// Chunk data following the common header
    pub chunks: &'a [u8],
}

impl<'a> SctpHeader<'a> {
    pub const HEADER_SIZE: usize = 12;

    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.len() < Self::HEADER_SIZE {
            return None;
        }

        Some(SctpHeader {
            source_port: u16::from_be_bytes([data[0], data[1]]),
            destination_port: u16::from_be_bytes([data[2], data[3]]),
            verification_tag: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            checksum: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            chunks: &data[Self::HEADER_SIZE..],
        })
    }

    pub fn info(&self) -> SctpInfo {
        SctpInfo {
            src_port: self.source_port,
            dst_port: self.destination_port,
        }
    }
}
