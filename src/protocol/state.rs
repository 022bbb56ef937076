use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

use super::message::{checksum, DataPacket, Frame, OutboundFrame, Status};
use super::queue::OutboundQueue;
use crate::core::{Config, Error, Result, RingIdentity};

/// Protocol timing configuration
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// How long the generator waits before declaring the token lost
    pub token_timeout: Duration,
    /// Period of the generator's token-loss monitor
    pub monitor_interval: Duration,
    /// Simulated network latency applied before every token send
    pub forward_delay: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            token_timeout: Duration::from_secs(15),
            monitor_interval: Duration::from_secs(1),
            forward_delay: Duration::from_secs(3),
        }
    }
}

impl ProtocolConfig {
    /// Extracts the timing parameters of a node configuration
    pub fn from_config(config: &Config) -> Self {
        ProtocolConfig {
            token_timeout: config.token_timeout,
            forward_delay: config.forward_delay,
            ..ProtocolConfig::default()
        }
    }
}

/// Mutable node state shared between the receive loop and the monitor task
#[derive(Debug, Default)]
struct RuntimeState {
    /// Whether this node currently holds the token
    has_token: bool,
    /// When the token was last seen or generated here
    last_token: Option<Instant>,
    /// Whether circulation has been armed on this (generator) node
    started: bool,
}

/// A message handed to the application boundary after a successful claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub origin: String,
    pub message: String,
}

/// Owns token possession and the loss-recovery policy.
///
/// The token is the ring's single transmission permit: holding it is the
/// only license to emit a fresh data packet. All possession state lives
/// behind one mutex; lock scopes never span an await.
pub struct TokenController {
    identity: RingIdentity,
    config: ProtocolConfig,
    runtime: Mutex<RuntimeState>,
    queue: Arc<OutboundQueue>,
    outbound_tx: mpsc::Sender<OutboundFrame>,
}

impl TokenController {
    /// Creates a new token controller
    pub fn new(
        identity: RingIdentity,
        config: ProtocolConfig,
        queue: Arc<OutboundQueue>,
        outbound_tx: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        TokenController {
            identity,
            config,
            runtime: Mutex::new(RuntimeState::default()),
            queue,
            outbound_tx,
        }
    }

    fn runtime(&self) -> MutexGuard<'_, RuntimeState> {
        self.runtime.lock().unwrap()
    }

    /// Whether this node currently holds the token
    pub fn has_token(&self) -> bool {
        self.runtime().has_token
    }

    /// Handles an arriving token.
    ///
    /// If a message is waiting, its packet goes out and the token stays held
    /// until the packet's resolution returns to this node. Otherwise the
    /// token is passed on after the configured hold time.
    pub async fn on_token_received(&self) {
        {
            let mut runtime = self.runtime();
            runtime.has_token = true;
            runtime.last_token = Some(Instant::now());
        }
        info!("token received");

        match self.queue.dequeue() {
            Some(pending) => {
                let packet = DataPacket::new(
                    self.identity.nickname.clone(),
                    pending.destination,
                    pending.message,
                );
                debug!(destination = %packet.destination, "sending data packet");
                if let Err(e) = self.outbound_tx.send(OutboundFrame::fresh(packet)).await {
                    error!("failed to hand data packet to the transport: {}", e);
                }
            }
            None => {
                sleep(self.identity.token_hold).await;
                self.send_token().await;
            }
        }
    }

    /// Passes the token to the successor after the simulated network delay.
    ///
    /// A failed handoff is logged and not retried; possession is only
    /// cleared once the token actually left.
    pub async fn send_token(&self) {
        sleep(self.config.forward_delay).await;
        if let Err(e) = self.outbound_tx.send(OutboundFrame::relay(Frame::Token)).await {
            error!("failed to hand token to the transport: {}", e);
            return;
        }
        self.runtime().has_token = false;
        info!(successor = %self.identity.successor, "token passed on");
    }

    /// Releases a held token after the configured hold time.
    ///
    /// Used by the resolution paths: the origin keeps the token while its
    /// packet circulates and only lets go once the verdict is in.
    pub async fn release_token(&self) {
        sleep(self.identity.token_hold).await;
        self.send_token().await;
    }

    /// Arms token circulation. Only valid on the generator; the first call
    /// injects the token, later calls are no-ops.
    pub async fn start(&self) -> Result<()> {
        if !self.identity.is_generator {
            return Err(Error::invalid_state(
                "only the token generator can start circulation",
            ));
        }
        {
            let mut runtime = self.runtime();
            if runtime.started {
                warn!("token circulation already started");
                return Ok(());
            }
            runtime.started = true;
            runtime.has_token = true;
            runtime.last_token = Some(Instant::now());
        }
        info!("starting token circulation");
        self.send_token().await;
        Ok(())
    }

    /// Checks for token loss, claiming a regenerated token when stale.
    ///
    /// Best-effort detection: a merely delayed token produces a duplicate,
    /// which the ring tolerates.
    fn check_token_loss(&self) -> bool {
        let mut runtime = self.runtime();
        let stale = runtime.started
            && runtime
                .last_token
                .is_some_and(|seen| seen.elapsed() > self.config.token_timeout);
        if stale {
            runtime.has_token = true;
            runtime.last_token = Some(Instant::now());
        }
        stale
    }

    /// Periodic token-loss monitor; runs only on the generator node
    pub async fn run_monitor(&self) {
        let mut tick = interval(self.config.monitor_interval);
        loop {
            tick.tick().await;
            if self.check_token_loss() {
                warn!(
                    timeout = ?self.config.token_timeout,
                    "token timeout exceeded, regenerating"
                );
                self.send_token().await;
            }
        }
    }
}

/// The relay state machine for data packets.
///
/// Decides per packet between claiming it as a recipient, resolving it as
/// the origin, or forwarding it unchanged. The claim and origin checks are
/// independent, so a self-addressed packet runs both in one pass.
pub struct DataPacketHandler {
    identity: RingIdentity,
    queue: Arc<OutboundQueue>,
    controller: Arc<TokenController>,
    outbound_tx: mpsc::Sender<OutboundFrame>,
    delivery_tx: mpsc::Sender<Delivery>,
}

impl DataPacketHandler {
    /// Creates a new data packet handler
    pub fn new(
        identity: RingIdentity,
        queue: Arc<OutboundQueue>,
        controller: Arc<TokenController>,
        outbound_tx: mpsc::Sender<OutboundFrame>,
        delivery_tx: mpsc::Sender<Delivery>,
    ) -> Self {
        DataPacketHandler {
            identity,
            queue,
            controller,
            outbound_tx,
            delivery_tx,
        }
    }

    /// Processes one decoded data packet
    pub async fn on_packet_received(&self, mut packet: DataPacket) {
        if packet.destination == self.identity.nickname || packet.is_broadcast() {
            if checksum(&packet.message) != packet.checksum {
                warn!(origin = %packet.origin, "checksum mismatch, flagging for retransmission");
                packet.status = Status::Nack;
            } else {
                info!(origin = %packet.origin, message = %packet.message, "message received");
                packet.status = Status::Ack;
                let delivery = Delivery {
                    origin: packet.origin.clone(),
                    message: packet.message.clone(),
                };
                if self.delivery_tx.try_send(delivery).is_err() {
                    warn!("application boundary is full, delivery dropped");
                }
            }
        }

        if packet.origin == self.identity.nickname {
            // The packet completed a full traversal; resolve it and let the
            // token go.
            match packet.status {
                Status::Ack => {
                    info!(destination = %packet.destination, "message delivered");
                }
                Status::Nack => {
                    info!(destination = %packet.destination, "message needs retransmission");
                    if let Err(e) = self
                        .queue
                        .enqueue(packet.destination.clone(), packet.message.clone())
                    {
                        error!("cannot requeue for retransmission: {}", e);
                    }
                }
                Status::Unrouted => {
                    warn!(destination = %packet.destination, "destination not found on the ring");
                }
            }
            self.controller.release_token().await;
        } else if let Err(e) = self
            .outbound_tx
            .send(OutboundFrame::relay(Frame::Data(packet)))
            .await
        {
            error!("failed to forward data packet: {}", e);
        }
    }
}
