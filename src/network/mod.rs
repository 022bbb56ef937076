//! UDP transport composition and fault injection
//!
//! This module wires the protocol state machines to the socket: the receive
//! loop, the outbound path through the fault injector, and the command
//! handle exposed to callers.

mod connection;
mod fault;

pub use self::connection::{NodeHandle, RingNode};
pub use self::fault::ErrorInjector;
