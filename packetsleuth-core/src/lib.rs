//! PacketSleuth Core Library
//!
//! This crate provides the record types, capture-side frame type, interface
//! description and error taxonomy shared by every stage of the
//! capture → classify → aggregate → export pipeline.

pub mod error;
pub mod frame;
pub mod interface;
pub mod packet;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use frame::{Frame, LinkHint};
pub use interface::Interface;
pub use packet::{ArpInfo, Packet, SctpInfo};
pub use types::*;
