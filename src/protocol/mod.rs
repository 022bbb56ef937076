//! Wire messages, codec, queueing, and the token/data state machines
//!
//! Everything here is transport-agnostic: the state machines emit
//! [`OutboundFrame`]s through a channel and never touch the socket.

pub mod codec;
pub mod message;
pub mod queue;
pub mod state;

pub use self::codec::RingCodec;
pub use self::message::{checksum, DataPacket, Frame, OutboundFrame, Status};
pub use self::queue::{OutboundMessage, OutboundQueue};
pub use self::state::{DataPacketHandler, Delivery, ProtocolConfig, TokenController};
