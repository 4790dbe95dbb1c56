//! Common types used throughout PacketSleuth

use std::fmt;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Build from a slice of exactly six bytes
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Link-layer address of any length, as carried in ARP
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HardwareAddr {
    Mac(MacAddr),
    Other(Vec<u8>),
}

impl HardwareAddr {
    /// Six-byte addresses become [`HardwareAddr::Mac`]
    pub fn from_slice(slice: &[u8]) -> Self {
        match MacAddr::from_slice(slice) {
            Some(mac) => HardwareAddr::Mac(mac),
            None => HardwareAddr::Other(slice.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HardwareAddr::Mac(mac) => mac.as_bytes(),
            HardwareAddr::Other(bytes) => bytes,
        }
    }

    pub fn mac(&self) -> Option<MacAddr> {
        match self {
            HardwareAddr::Mac(mac) => Some(*mac),
            HardwareAddr::Other(_) => None,
        }
    }
}

impl From<MacAddr> for HardwareAddr {
    fn from(mac: MacAddr) -> Self {
        HardwareAddr::Mac(mac)
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareAddr::Mac(mac) => mac.fmt(f),
            HardwareAddr::Other(bytes) => {
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Link layer recognised on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkType {
    Ethernet,
    #[default]
    Unknown,
}

/// Network layer recognised on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkType {
    IPv4,
    IPv6,
    ARP,
    #[default]
    Unknown,
}

/// Transport layer recognised on a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportType {
    TCP,
    UDP,
    SCTP,
    #[default]
    Unknown,
}

/// Application protocol inferred from ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Application {
    HTTP,
    DNS,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Ethernet => "Ethernet",
            LinkType::Unknown => "Unknown",
        }
    }
}

impl NetworkType {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkType::IPv4 => "IPv4",
            NetworkType::IPv6 => "IPv6",
            NetworkType::ARP => "ARP",
            NetworkType::Unknown => "Unknown",
        }
    }

    /// IPv4 or IPv6
    pub fn is_ip(self) -> bool {
        matches!(self, NetworkType::IPv4 | NetworkType::IPv6)
    }
}

impl TransportType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::TCP => "TCP",
            TransportType::UDP => "UDP",
            TransportType::SCTP => "SCTP",
            TransportType::Unknown => "Unknown",
        }
    }
}

impl Application {
    pub fn as_str(self) -> &'static str {
        match self {
            Application::HTTP => "HTTP",
            Application::DNS => "DNS",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(LinkType, NetworkType, TransportType, Application);

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const DOT1Q: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
}

/// IP protocol numbers
pub mod ip_protocols {
    pub const HOP_BY_HOP: u8 = 0;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6_ROUTING: u8 = 43;
    pub const IPV6_FRAGMENT: u8 = 44;
    pub const IPV6_DEST_OPTS: u8 = 60;
    pub const SCTP: u8 = 132;
}

/// Ports used by the application heuristics
pub mod well_known_ports {
    pub const DNS: u16 = 53;
    pub const HTTP: u16 = 80;
    pub const HTTPS: u16 = 443;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display() {
        let mac = MacAddr::new([0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
        assert_eq!(MacAddr::broadcast().to_string(), "ff:ff:ff:ff:ff:ff");
    }

    #[test]
    fn test_mac_from_slice() {
        assert_eq!(
            MacAddr::from_slice(&[0xff; 6]),
            Some(MacAddr::broadcast())
        );
        assert_eq!(MacAddr::from_slice(&[0xff; 5]), None);
    }

    #[test]
    fn test_hardware_addr_keeps_any_length() {
        let mac = MacAddr::new([0x02, 0, 0, 0, 0, 0x01]);
        assert_eq!(HardwareAddr::from_slice(mac.as_bytes()), HardwareAddr::Mac(mac));
        assert_eq!(HardwareAddr::from(mac).mac(), Some(mac));

        let long = HardwareAddr::from_slice(&[0xde, 0xad, 0xbe, 0xef, 0, 1, 2, 3]);
        assert_eq!(long.mac(), None);
        assert_eq!(long.as_bytes().len(), 8);
        assert_eq!(long.to_string(), "de:ad:be:ef:00:01:02:03");
    }

    #[test]
    fn test_defaults_are_unknown() {
        assert_eq!(LinkType::default(), LinkType::Unknown);
        assert_eq!(NetworkType::default(), NetworkType::Unknown);
        assert_eq!(TransportType::default(), TransportType::Unknown);
        assert!(NetworkType::IPv6.is_ip());
        assert!(!NetworkType::ARP.is_ip());
        assert_eq!(Application::DNS.to_string(), "DNS");
    }
}
