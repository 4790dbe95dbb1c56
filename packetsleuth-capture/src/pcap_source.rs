//! Live capture through libpcap

use pcap::{Active, Capture, Device};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use packetsleuth_core::{Error, Frame, Interface, LinkHint, Result};

use crate::interface::list_interfaces;
use crate::source::{CaptureHandle, CaptureSource};

/// Default snapshot length (maximum bytes per packet)
pub const DEFAULT_SNAPLEN: i32 = 1600;

/// Default read timeout, used only to observe the stop flag
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for opening pcap handles
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout
    pub poll_interval: Duration,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Buffer size (0 = default)
    pub buffer_size: i32,
    /// Enable immediate mode (deliver packets immediately)
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            promiscuous: true,
            buffer_size: 0,
            immediate_mode: true,
        }
    }
}

/// Capture source over pcap, with devices enumerated through pnet
#[derive(Debug, Clone, Default)]
pub struct PcapSource {
    config: CaptureConfig,
}

impl PcapSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn timeout_ms(&self) -> i32 {
        i32::try_from(self.config.poll_interval.as_millis())
            .unwrap_or(i32::MAX)
            .max(1)
    }
}

impl CaptureSource for PcapSource {
    fn list_devices(&self) -> Result<Vec<Interface>> {
        list_interfaces()
    }

    fn open(&self, interface: &Interface) -> Result<Box<dyn CaptureHandle>> {
        debug!("Initializing pcap capture on {}", interface.name);

        let device = Device::from(interface.name.as_str());
        let mut capture = Capture::from_device(device)
            .map_err(|e| Error::open(&interface.name, e))?
            .promisc(self.config.promiscuous)
            .snaplen(self.config.snaplen)
            .timeout(self.timeout_ms())
            .immediate_mode(self.config.immediate_mode);

        if self.config.buffer_size > 0 {
            capture = capture.buffer_size(self.config.buffer_size);
        }

        let capture = capture
            .open()
            .map_err(|e| Error::open(&interface.name, e))?;

        let link = LinkHint::from_dlt(capture.get_datalink().0);
        info!(interface = %interface.name, ?link, "Capture initialized");

        Ok(Box::new(PcapHandle {
            interface: interface.name.clone(),
            capture: Some(capture),
            link,
        }))
    }
}

/// An open pcap session
struct PcapHandle {
    interface: String,
    capture: Option<Capture<Active>>,
    link: LinkHint,
}

impl CaptureHandle for PcapHandle {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| Error::Capture(format!("{}: capture not active", self.interface)))?;

        match capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let timestamp = SystemTime::UNIX_EPOCH
                    + Duration::from_secs(ts.tv_sec.max(0) as u64)
                    + Duration::from_micros(ts.tv_usec.max(0) as u64);

                let frame = Frame::new(self.interface.as_str(), self.link, packet.data.to_vec())
                    .with_wire_len(packet.header.len as usize)
                    .with_timestamp(timestamp);
                Ok(Some(frame))
            }
            // Timeout is normal, the caller re-checks its stop flag
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::Capture(format!("{}: {}", self.interface, e))),
        }
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            debug!(interface = %self.interface, "Capture handle closed");
        }
    }

    fn kernel_drops(&mut self) -> Option<u64> {
        let stats = self.capture.as_mut()?.stats().ok()?;
        Some(stats.dropped as u64)
    }
}

impl Drop for PcapHandle {
    fn drop(&mut self) {
        self.close();
    }
}
