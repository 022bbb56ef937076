use std::collections::VecDeque;
use std::sync::Mutex;

use crate::core::{Error, Result, MAX_QUEUE_SIZE};

/// A message waiting for a token grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub destination: String,
    pub message: String,
}

/// Bounded FIFO of messages awaiting transmission.
///
/// Shared between the command surface (producer) and the receive loop's
/// token handling (consumer), so access is synchronized internally.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    items: Mutex<VecDeque<OutboundMessage>>,
}

impl OutboundQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        OutboundQueue {
            items: Mutex::new(VecDeque::with_capacity(MAX_QUEUE_SIZE)),
        }
    }

    /// Appends a message, failing with [`Error::QueueFull`] at capacity
    pub fn enqueue(&self, destination: impl Into<String>, message: impl Into<String>) -> Result<()> {
        let mut items = self.items.lock().unwrap();
        if items.len() >= MAX_QUEUE_SIZE {
            return Err(Error::QueueFull);
        }
        items.push_back(OutboundMessage {
            destination: destination.into(),
            message: message.into(),
        });
        Ok(())
    }

    /// Removes and returns the oldest message, if any
    pub fn dequeue(&self) -> Option<OutboundMessage> {
        self.items.lock().unwrap().pop_front()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Whether no messages are waiting
    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let queue = OutboundQueue::new();
        queue.enqueue("B", "first").unwrap();
        queue.enqueue("C", "second").unwrap();

        assert_eq!(queue.dequeue().unwrap().message, "first");
        assert_eq!(queue.dequeue().unwrap().message, "second");
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn enqueue_at_capacity_fails_and_leaves_queue_unchanged() {
        let queue = OutboundQueue::new();
        for i in 0..MAX_QUEUE_SIZE {
            queue.enqueue("B", format!("msg {}", i)).unwrap();
        }

        assert!(matches!(queue.enqueue("B", "overflow"), Err(Error::QueueFull)));
        assert_eq!(queue.len(), MAX_QUEUE_SIZE);
        assert_eq!(queue.dequeue().unwrap().message, "msg 0");
    }

    #[test]
    fn empty_queue_reports_itself() {
        let queue = OutboundQueue::new();
        assert!(queue.is_empty());
        queue.enqueue("B", "x").unwrap();
        assert!(!queue.is_empty());
    }
}
