//! ringlet: a UDP token-ring protocol node
//!
//! Implements one participant in a logical unidirectional ring: a circulating
//! token grants exclusive transmission rights, data packets carry a CRC-32
//! checksum, and an ACK/NACK cycle drives retransmission of corrupted
//! messages. The ring topology is static; each node only knows its successor.

pub mod core;
pub mod network;
pub mod protocol;

// Re-export commonly used items
pub use crate::core::{Config, Error, Result};
pub use crate::network::{NodeHandle, RingNode};
pub use crate::protocol::Delivery;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
