use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info};

use super::fault::ErrorInjector;
use crate::core::{Config, Result, RingIdentity, MAX_DATAGRAM_SIZE};
use crate::protocol::{
    DataPacketHandler, Delivery, Frame, OutboundFrame, OutboundQueue, ProtocolConfig, RingCodec,
    TokenController,
};

/// Command surface of a running node.
///
/// Cloneable; safe to use from any task while the node's loops run.
#[derive(Clone)]
pub struct NodeHandle {
    controller: Arc<TokenController>,
    queue: Arc<OutboundQueue>,
    shutdown_tx: mpsc::Sender<()>,
}

impl NodeHandle {
    /// Arms token circulation (generator node only, first call only)
    pub async fn start(&self) -> Result<()> {
        self.controller.start().await
    }

    /// Queues a message for transmission at the next token grant.
    ///
    /// Fails with [`crate::core::Error::QueueFull`] when the outbound queue
    /// is at capacity.
    pub fn send(&self, destination: impl Into<String>, message: impl Into<String>) -> Result<()> {
        self.queue.enqueue(destination, message)
    }

    /// Stops the node's loops and releases the transport
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// One ring participant: the UDP socket plus the protocol state machines.
///
/// Two long-lived execution contexts per node: the receive/send loop in
/// [`RingNode::run`], and (generator only) the token-loss monitor it spawns.
/// Each inbound datagram is dispatched to completion before the next one is
/// read, so at most one protocol decision is ever in flight.
pub struct RingNode {
    identity: RingIdentity,
    socket: UdpSocket,
    codec: RingCodec,
    injector: ErrorInjector,
    controller: Arc<TokenController>,
    handler: DataPacketHandler,
    queue: Arc<OutboundQueue>,
    outbound_rx: mpsc::Receiver<OutboundFrame>,
    delivery_rx: Option<mpsc::Receiver<Delivery>>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl RingNode {
    /// Binds the configured address and assembles the node
    pub async fn new(config: Config) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind)
            .await
            .map_err(|e| crate::core::Error::network(format!("failed to bind socket: {}", e)))?;
        Ok(Self::from_socket(socket, config))
    }

    /// Assembles a node around an already-bound socket.
    ///
    /// Useful when binding port 0 first to learn the local address before
    /// the ring topology is fixed, as the tests do.
    pub fn from_socket(socket: UdpSocket, config: Config) -> Self {
        let identity = RingIdentity::from_config(&config);
        let protocol_config = ProtocolConfig::from_config(&config);
        let injector = ErrorInjector::new(config.fault_probability);

        let queue = Arc::new(OutboundQueue::new());
        let (outbound_tx, outbound_rx) = mpsc::channel(100);
        let (delivery_tx, delivery_rx) = mpsc::channel(100);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let controller = Arc::new(TokenController::new(
            identity.clone(),
            protocol_config,
            Arc::clone(&queue),
            outbound_tx.clone(),
        ));
        let handler = DataPacketHandler::new(
            identity.clone(),
            Arc::clone(&queue),
            Arc::clone(&controller),
            outbound_tx,
            delivery_tx,
        );

        RingNode {
            identity,
            socket,
            codec: RingCodec::new(),
            injector,
            controller,
            handler,
            queue,
            outbound_rx,
            delivery_rx: Some(delivery_rx),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| crate::core::Error::network(format!("failed to get local address: {}", e)))
    }

    /// Returns a handle for issuing commands to this node
    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            controller: Arc::clone(&self.controller),
            queue: Arc::clone(&self.queue),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Takes the application-boundary receiver of claimed messages.
    ///
    /// Returns `None` on every call after the first.
    pub fn deliveries(&mut self) -> Option<mpsc::Receiver<Delivery>> {
        self.delivery_rx.take()
    }

    /// Runs the node until shutdown
    pub async fn run(self) -> Result<()> {
        let RingNode {
            identity,
            socket,
            mut codec,
            injector,
            controller,
            handler,
            queue: _queue,
            mut outbound_rx,
            delivery_rx: _delivery_rx,
            shutdown_tx: _shutdown_tx,
            mut shutdown_rx,
        } = self;

        let monitor = if identity.is_generator {
            let controller = Arc::clone(&controller);
            Some(tokio::spawn(async move { controller.run_monitor().await }))
        } else {
            None
        };

        info!(
            nickname = %identity.nickname,
            successor = %identity.successor,
            generator = identity.is_generator,
            "ring node running"
        );

        let mut recv_buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut send_buf = BytesMut::new();

        loop {
            tokio::select! {
                Some(outbound) = outbound_rx.recv() => {
                    send_buf.clear();
                    if let Err(e) = codec.encode(outbound.frame, &mut send_buf) {
                        error!("failed to encode outbound frame: {}", e);
                        continue;
                    }
                    if outbound.inject {
                        injector.inject(&mut send_buf[..]);
                    }
                    if let Err(e) = socket.send_to(&send_buf, identity.successor).await {
                        error!("failed to send datagram: {}", e);
                    }
                }

                result = socket.recv_from(&mut recv_buf) => {
                    match result {
                        Ok((size, _addr)) => {
                            let mut datagram = BytesMut::from(&recv_buf[..size]);
                            match codec.decode(&mut datagram) {
                                Ok(Some(Frame::Token)) => controller.on_token_received().await,
                                Ok(Some(Frame::Data(packet))) => {
                                    handler.on_packet_received(packet).await
                                }
                                Ok(None) => {}
                                Err(e) => debug!("dropping malformed datagram: {}", e),
                            }
                        }
                        Err(e) => error!("failed to receive datagram: {}", e),
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!(nickname = %identity.nickname, "shutting down");
                    break;
                }
            }
        }

        if let Some(monitor) = monitor {
            monitor.abort();
        }
        Ok(())
    }
}
