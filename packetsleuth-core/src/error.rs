//! Error types for PacketSleuth

use thiserror::Error;

/// Result type alias for PacketSleuth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for PacketSleuth
///
/// Only the startup variants (`NoInterfaces`, `Bind`, `Config`) are meant to
/// reach the process entry point. Everything else is contained by the stage
/// that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture could not start on an interface
    #[error("Failed to open interface '{interface}': {reason}")]
    Open { interface: String, reason: String },

    /// Frame metadata unreadable at the structural level
    #[error("Frame decode error: {0}")]
    Decode(String),

    /// Fatal error on an already opened capture handle
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// No capture-capable interface is available
    #[error("No network interfaces available for capture")]
    NoInterfaces,

    /// Time-series store write failed
    #[error("Export error: {0}")]
    Export(String),

    /// Metrics endpoint could not be bound
    #[error("Failed to bind metrics endpoint {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Packet construction error
    #[error("Failed to construct packet: {0}")]
    PacketConstruction(String),
}

impl Error {
    /// Create an open error for an interface
    pub fn open<S: Into<String>, R: ToString>(interface: S, reason: R) -> Self {
        Error::Open {
            interface: interface.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a decode error with a custom message
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create an export error with a custom message
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Error::Export(msg.into())
    }
}
