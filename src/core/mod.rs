//! Core types and constants for the token-ring protocol
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod serde;
pub mod types;

pub use self::error::{Error, Result};
pub use self::types::{Config, RingIdentity};

/// Wire sentinel for the circulating token
pub const TOKEN_SENTINEL: &str = "9000";

/// Wire prefix marking a data packet
pub const DATA_PREFIX: &str = "7777";

/// Destination literal addressing every node on the ring
pub const BROADCAST: &str = "TODOS";

/// Maximum number of messages waiting for a token grant
pub const MAX_QUEUE_SIZE: usize = 10;

/// Maximum datagram size in bytes
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Default port for ring nodes
pub const DEFAULT_PORT: u16 = 6000;
