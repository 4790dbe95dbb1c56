//! Multi-interface packet capture for PacketSleuth
//!
//! This crate opens live captures, classifies every frame, and fans the
//! resulting records into one bounded queue.
//!
//! ## Features
//!
//! - **Interface Management**: enumerate devices through pnet and select the capture set
//! - **Live Capture**: pcap handles with a short read timeout for shutdown polling
//! - **Supervision**: one OS thread per interface with isolated failure
//! - **Backpressure**: a full queue blocks the capture threads rather than dropping records
//! - **Statistics**: per-worker frame, byte, decode-error and blocked-send counters
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use packetsleuth_capture::{CaptureSupervisor, PcapSource, SupervisorConfig};
//!
//! # async fn run() -> packetsleuth_core::Result<()> {
//! let source = Arc::new(PcapSource::default());
//! let mut stream = CaptureSupervisor::new(source, SupervisorConfig::default()).start()?;
//! let handle = stream.handle();
//!
//! while let Some(packet) = stream.recv().await {
//!     println!("{} {:?} {} bytes", packet.interface, packet.transport_type, packet.payload_size);
//! }
//!
//! handle.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod interface;
pub mod memory;
pub mod pcap_source;
pub mod source;
pub mod stats;
pub mod supervisor;

// Re-export main types
pub use interface::{list_capture_interfaces, list_interfaces};
pub use memory::{FrameFeed, MemorySource};
pub use pcap_source::{CaptureConfig, PcapSource};
pub use source::{CaptureHandle, CaptureSource};
pub use stats::{CaptureStats, StatsAccumulator};
pub use supervisor::{
    CaptureSupervisor, PacketStream, SupervisorConfig, SupervisorHandle, WorkerState,
};
