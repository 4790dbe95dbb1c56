//! Network interface types

use crate::MacAddr;
use std::fmt;
use std::net::IpAddr;

/// A capture source identity
///
/// One capture worker binds to exactly one interface for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Interface name used to open a capture session (e.g., "eth0", "en0")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// MAC address if the interface has one
    pub mac: Option<MacAddr>,
    /// Addresses assigned to this interface
    pub ips: Vec<IpAddr>,
    /// Is interface up?
    pub is_up: bool,
    /// Is interface a loopback?
    pub is_loopback: bool,
}

impl Interface {
    /// Create a new interface that is up and not a loopback
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mac: None,
            ips: Vec::new(),
            is_up: true,
            is_loopback: false,
        }
    }

    /// Check if the interface is suitable for packet capture
    pub fn is_capture_capable(&self, include_loopback: bool) -> bool {
        self.is_up && (include_loopback || !self.is_loopback)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(mac) = self.mac {
            write!(f, " ({})", mac)?;
        }
        if !self.ips.is_empty() {
            let ips: Vec<String> = self.ips.iter().map(|ip| ip.to_string()).collect();
            write!(f, " [{}]", ips.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_capture_capable() {
        let mut iface = Interface::new("lo");
        iface.is_loopback = true;
        assert!(!iface.is_capture_capable(false));
        assert!(iface.is_capture_capable(true));

        iface.is_up = false;
        assert!(!iface.is_capture_capable(true));
    }

    #[test]
    fn test_display() {
        let mut iface = Interface::new("eth0");
        iface.mac = Some(MacAddr::new([0, 0x11, 0x22, 0x33, 0x44, 0x55]));
        iface.ips.push(Ipv4Addr::new(192, 168, 1, 10).into());
        assert_eq!(iface.to_string(), "eth0 (00:11:22:33:44:55) [192.168.1.10]");
    }
}
