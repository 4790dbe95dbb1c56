//! Network interface enumeration and information

use pnet_datalink::{self, NetworkInterface};
use std::net::IpAddr;

use packetsleuth_core::{Error, Interface, MacAddr, Result};

/// Convert a pnet interface into the pipeline's interface record
pub fn from_pnet(iface: &NetworkInterface) -> Interface {
    let mac = iface
        .mac
        .map(|mac| MacAddr::new([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]));

    let ips: Vec<IpAddr> = iface.ips.iter().map(|network| network.ip()).collect();

    Interface {
        name: iface.name.clone(),
        description: iface.description.clone(),
        mac,
        ips,
        is_up: iface.is_up(),
        is_loopback: iface.is_loopback(),
    }
}

/// List all available network interfaces
pub fn list_interfaces() -> Result<Vec<Interface>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::NoInterfaces);
    }

    Ok(interfaces.iter().map(from_pnet).collect())
}

/// List all interfaces suitable for packet capture
pub fn list_capture_interfaces(include_loopback: bool) -> Result<Vec<Interface>> {
    Ok(list_interfaces()?
        .into_iter()
        .filter(|iface| iface.is_capture_capable(include_loopback))
        .collect())
}
