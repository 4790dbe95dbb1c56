//! Traffic aggregation and export for PacketSleuth
//!
//! The [`Monitor`] drains the capture fan-in queue into an [`Aggregator`].
//! Two exporters read from it:
//!
//! - **Pull**: [`exposition::render`] served at `/metrics` by [`server`]
//! - **Push**: per-packet [`Point`]s offered to a bounded [`PushQueue`] and
//!   written to InfluxDB in batches by a [`PushExporter`]
//!
//! All counters are cumulative for the process lifetime. Byte totals are
//! exposed as raw counters; rates are left to the query side.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::SystemTime;
//! use packetsleuth_core::{Packet, TransportType};
//! use packetsleuth_metrics::{exposition, Aggregator};
//!
//! let aggregator = Arc::new(Aggregator::default());
//!
//! let mut packet = Packet::unknown("eth0", SystemTime::now());
//! packet.transport_type = TransportType::UDP;
//! packet.payload_size = 64;
//! aggregator.observe(&packet);
//!
//! let text = exposition::render(&aggregator.snapshot());
//! assert!(text.contains("packetsleuth_packet_udp_count 1"));
//! ```

pub mod aggregator;
pub mod exposition;
pub mod histogram;
pub mod influx;
pub mod monitor;
pub mod point;
pub mod push;
pub mod server;

pub use aggregator::{Aggregator, AggregatorConfig, MetricsSnapshot};
pub use histogram::{Bucket, CappedHistogram, DEFAULT_MAX_KEYS, OTHER_KEY};
pub use influx::{InfluxConfig, InfluxSink, PointSink};
pub use monitor::Monitor;
pub use point::{FieldValue, Point};
pub use push::{PushConfig, PushExporter, PushQueue};
