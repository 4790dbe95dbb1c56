//! Raw captured frames

use std::time::SystemTime;

/// Link-layer type reported by the capture source (pcap DLT values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHint {
    /// DLT_EN10MB (1)
    Ethernet,
    /// DLT_NULL (0) or DLT_LOOP (108), BSD loopback with a 4-byte family header
    Null,
    /// DLT_RAW (12 / 14 / 101), bare IP
    Raw,
    /// DLT_LINUX_SLL (113), Linux cooked capture
    LinuxSll,
    /// Anything else
    Other(i32),
}

impl LinkHint {
    /// Map a pcap data link type number
    pub fn from_dlt(dlt: i32) -> Self {
        match dlt {
            1 => LinkHint::Ethernet,
            0 | 108 => LinkHint::Null,
            12 | 14 | 101 => LinkHint::Raw,
            113 => LinkHint::LinuxSll,
            other => LinkHint::Other(other),
        }
    }
}

/// A frame as delivered by a capture handle, before any protocol parsing
#[derive(Debug, Clone)]
pub struct Frame {
    /// Interface the frame was captured on
    pub interface: String,
    /// Link-layer type of the capture
    pub link: LinkHint,
    /// Captured bytes (possibly truncated to the snapshot length)
    pub data: Vec<u8>,
    /// Original length on the wire
    pub wire_len: usize,
    /// Capture timestamp
    pub timestamp: SystemTime,
}

impl Frame {
    /// Create a frame whose wire length equals its captured length
    pub fn new(interface: impl Into<String>, link: LinkHint, data: Vec<u8>) -> Self {
        let wire_len = data.len();
        Self {
            interface: interface.into(),
            link,
            data,
            wire_len,
            timestamp: SystemTime::now(),
        }
    }

    /// Override the capture timestamp
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the wire length
    pub fn with_wire_len(mut self, wire_len: usize) -> Self {
        self.wire_len = wire_len;
        self
    }

    /// Captured length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
