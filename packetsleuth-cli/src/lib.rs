//! Command-line agent for PacketSleuth
//!
//! This crate parses the command line, validates it into an
//! [`AgentConfig`], sets up logging and wires the capture, aggregation and
//! export stages together.

pub mod agent;
pub mod args;
pub mod config;
pub mod telemetry;

pub use args::{Cli, Commands, InfluxArgs};
pub use config::AgentConfig;
