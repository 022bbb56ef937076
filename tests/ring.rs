//! End-to-end ring exercises over real loopback UDP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

use ringlet::{Config, Delivery, RingNode};

async fn bound_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

fn ring_config(nickname: &str, successor: SocketAddr, generator: bool) -> Config {
    Config {
        bind: "127.0.0.1:0".parse().unwrap(),
        successor,
        nickname: nickname.into(),
        token_hold: Duration::from_millis(5),
        token_generator: generator,
        token_timeout: Duration::from_secs(30),
        forward_delay: Duration::ZERO,
        fault_probability: 0.0,
    }
}

async fn expect_delivery(rx: &mut mpsc::Receiver<Delivery>) -> Delivery {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no delivery within timeout")
        .expect("delivery channel closed")
}

#[tokio::test]
async fn self_addressed_message_round_trips_the_ring() {
    let socket = bound_socket().await;
    let addr = socket.local_addr().unwrap();

    // A ring of one: the node is its own successor.
    let mut node = RingNode::from_socket(socket, ring_config("A", addr, true));
    let handle = node.handle();
    let mut deliveries = node.deliveries().unwrap();
    let task = tokio::spawn(node.run());

    handle.send("A", "hello ring").unwrap();
    handle.start().await.unwrap();

    let delivery = expect_delivery(&mut deliveries).await;
    assert_eq!(delivery.origin, "A");
    assert_eq!(delivery.message, "hello ring");

    handle.shutdown();
    timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn message_crosses_a_two_node_ring() {
    let socket_a = bound_socket().await;
    let socket_b = bound_socket().await;
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let node_a = RingNode::from_socket(socket_a, ring_config("A", addr_b, true));
    let mut node_b = RingNode::from_socket(socket_b, ring_config("B", addr_a, false));

    let handle_a = node_a.handle();
    let handle_b = node_b.handle();
    let mut deliveries_b = node_b.deliveries().unwrap();

    let task_a = tokio::spawn(node_a.run());
    let task_b = tokio::spawn(node_b.run());

    handle_a.send("B", "ping across").unwrap();
    handle_a.start().await.unwrap();

    let delivery = expect_delivery(&mut deliveries_b).await;
    assert_eq!(delivery.origin, "A");
    assert_eq!(delivery.message, "ping across");

    handle_a.shutdown();
    handle_b.shutdown();
    for task in [task_a, task_b] {
        timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn broadcast_reaches_every_node_on_the_ring() {
    let socket_a = bound_socket().await;
    let socket_b = bound_socket().await;
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let mut node_a = RingNode::from_socket(socket_a, ring_config("A", addr_b, true));
    let mut node_b = RingNode::from_socket(socket_b, ring_config("B", addr_a, false));

    let handle_a = node_a.handle();
    let handle_b = node_b.handle();
    let mut deliveries_a = node_a.deliveries().unwrap();
    let mut deliveries_b = node_b.deliveries().unwrap();

    let task_a = tokio::spawn(node_a.run());
    let task_b = tokio::spawn(node_b.run());

    handle_a.send("TODOS", "to everyone").unwrap();
    handle_a.start().await.unwrap();

    // The broadcast keeps circulating after the first claim: B claims it on
    // the way around, and so does the origin itself when the packet returns.
    assert_eq!(expect_delivery(&mut deliveries_b).await.message, "to everyone");
    assert_eq!(expect_delivery(&mut deliveries_a).await.message, "to everyone");

    handle_a.shutdown();
    handle_b.shutdown();
    for task in [task_a, task_b] {
        timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn unrouted_destination_does_not_stall_the_ring() {
    let socket_a = bound_socket().await;
    let socket_b = bound_socket().await;
    let addr_a = socket_a.local_addr().unwrap();
    let addr_b = socket_b.local_addr().unwrap();

    let node_a = RingNode::from_socket(socket_a, ring_config("A", addr_b, true));
    let mut node_b = RingNode::from_socket(socket_b, ring_config("B", addr_a, false));

    let handle_a = node_a.handle();
    let handle_b = node_b.handle();
    let mut deliveries_b = node_b.deliveries().unwrap();

    let task_a = tokio::spawn(node_a.run());
    let task_b = tokio::spawn(node_b.run());

    // Nobody on the ring is called Z; the first packet comes back unrouted
    // and is dropped, the token is released, and the second message still
    // goes through.
    handle_a.send("Z", "into the void").unwrap();
    handle_a.send("B", "after the void").unwrap();
    handle_a.start().await.unwrap();

    let delivery = expect_delivery(&mut deliveries_b).await;
    assert_eq!(delivery.message, "after the void");

    handle_a.shutdown();
    handle_b.shutdown();
    for task in [task_a, task_b] {
        timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
