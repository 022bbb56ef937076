use crate::core::BROADCAST;

/// Delivery status carried by a data packet.
///
/// A packet is created `Unrouted` and keeps that status until some node on
/// the ring claims it as a destination and overwrites it with the checksum
/// verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No node has claimed the packet yet
    Unrouted,
    /// A recipient verified the checksum and accepted the message
    Ack,
    /// A recipient detected a checksum mismatch
    Nack,
}

impl Status {
    /// Returns the literal used for this status on the wire.
    ///
    /// `naoexiste` is the historical unrouted literal; it is kept for wire
    /// compatibility with existing deployments.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Status::Unrouted => "naoexiste",
            Status::Ack => "ACK",
            Status::Nack => "NACK",
        }
    }

    /// Parses a wire literal into a status
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "naoexiste" => Some(Status::Unrouted),
            "ACK" => Some(Status::Ack),
            "NACK" => Some(Status::Nack),
            _ => None,
        }
    }
}

/// An application message travelling the ring.
///
/// The checksum is computed once by the origin and never recomputed on
/// forward; a claiming recipient only compares it against the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Current delivery status
    pub status: Status,
    /// Nickname of the node that created the packet
    pub origin: String,
    /// Target nickname, or the broadcast literal
    pub destination: String,
    /// Decimal CRC-32 of `message`, as computed by the origin
    pub checksum: String,
    /// The application payload
    pub message: String,
}

impl DataPacket {
    /// Creates a fresh unrouted packet, stamping the origin's checksum
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        DataPacket {
            status: Status::Unrouted,
            origin: origin.into(),
            destination: destination.into(),
            checksum: checksum(&message),
            message,
        }
    }

    /// Whether the packet addresses every node on the ring
    pub fn is_broadcast(&self) -> bool {
        self.destination == BROADCAST
    }
}

/// The two datagram kinds a ring node exchanges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The circulating transmission permit
    Token,
    /// An application data packet
    Data(DataPacket),
}

/// A frame queued for transmission to the successor.
///
/// `inject` marks freshly created packets, the only traffic the fault
/// injector may corrupt; tokens and relayed packets pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub frame: Frame,
    pub inject: bool,
}

impl OutboundFrame {
    /// Wraps a packet this node just created
    pub fn fresh(packet: DataPacket) -> Self {
        OutboundFrame {
            frame: Frame::Data(packet),
            inject: true,
        }
    }

    /// Wraps a token or a packet forwarded on behalf of another node
    pub fn relay(frame: Frame) -> Self {
        OutboundFrame {
            frame,
            inject: false,
        }
    }
}

/// Computes the integrity checksum of a message as it appears on the wire:
/// the CRC-32 of its UTF-8 bytes, rendered in decimal.
pub fn checksum(message: &str) -> String {
    crc32(message.as_bytes()).to_string()
}

/// Compute the CRC-32 (IEEE 802.3) of `data`.
///
/// Bit-reflected, polynomial 0xEDB88320, initial value and final XOR of all
/// ones. Every node must produce identical values for identical payloads, so
/// the computation depends on nothing platform-specific.
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xffff_ffff;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}
