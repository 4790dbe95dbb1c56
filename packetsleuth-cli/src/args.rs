//! CLI argument parsing
//!
//! Every flag has a default; the InfluxDB settings can also come from the
//! environment.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use packetsleuth_capture::pcap_source::{DEFAULT_POLL_INTERVAL, DEFAULT_SNAPLEN};
use packetsleuth_capture::supervisor::DEFAULT_QUEUE_CAPACITY;
use packetsleuth_metrics::push::{DEFAULT_EXPORT_BATCH_SIZE, DEFAULT_EXPORT_QUEUE_CAPACITY};
use packetsleuth_metrics::DEFAULT_MAX_KEYS;

#[derive(Parser, Debug)]
#[command(name = "packetsleuth")]
#[command(version, about = "Passive network traffic metrics agent", long_about = None)]
pub struct Cli {
    /// Interface to capture on (repeatable, default: every capture-capable device)
    #[arg(short = 'I', long = "interface", value_name = "NAME")]
    pub interfaces: Vec<String>,

    /// Also capture on loopback devices when no interface is named
    #[arg(long)]
    pub include_loopback: bool,

    /// Address for the /metrics endpoint
    #[arg(long, env = "PACKETSLEUTH_LISTEN", default_value = "0.0.0.0:2112")]
    pub listen: SocketAddr,

    /// Capacity of the queue between capture workers and the aggregator
    #[arg(long, value_name = "PACKETS", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Distinct keys per port/IP histogram before folding into "other"
    #[arg(long, value_name = "KEYS", default_value_t = DEFAULT_MAX_KEYS)]
    pub max_histogram_keys: usize,

    /// Maximum bytes captured per frame
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_SNAPLEN)]
    pub snaplen: i32,

    /// Capture read timeout used to notice shutdown
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Do not put interfaces into promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    #[command(flatten)]
    pub influx: InfluxArgs,

    /// Verbose output (-v debug, -vv trace; otherwise RUST_LOG or info)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Push export to InfluxDB
#[derive(Args, Debug)]
pub struct InfluxArgs {
    /// Write one point per packet to InfluxDB
    #[arg(long, env = "PACKETSLEUTH_INFLUX_ENABLED")]
    pub influx_enabled: bool,

    #[arg(long, env = "INFLUXDB_HOST", default_value = "http://localhost:8086")]
    pub influx_url: String,

    #[arg(long, env = "INFLUXDB_ORG", default_value = "myorg")]
    pub influx_org: String,

    #[arg(long, env = "INFLUXDB_BUCKET", default_value = "mybucket")]
    pub influx_bucket: String,

    #[arg(long, env = "INFLUXDB_USER", default_value = "admin")]
    pub influx_user: String,

    #[arg(
        long,
        env = "INFLUXDB_PASSWORD",
        default_value = "password",
        hide_env_values = true
    )]
    pub influx_password: String,

    /// Points buffered for the exporter before new ones are dropped
    #[arg(long, value_name = "POINTS", default_value_t = DEFAULT_EXPORT_QUEUE_CAPACITY)]
    pub export_queue_capacity: usize,

    /// Maximum points per write request
    #[arg(long, value_name = "POINTS", default_value_t = DEFAULT_EXPORT_BATCH_SIZE)]
    pub export_batch_size: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available network interfaces
    Interfaces {
        /// Show interfaces that are down too
        #[arg(short, long)]
        all: bool,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
