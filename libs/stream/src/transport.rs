//! Pub/sub transport abstraction and an in-memory implementation.
//!
//! Spec §4.8 describes "a pub/sub transport (queues or ZeroMQ)" without
//! mandating one; out-of-process transports (ZeroMQ, a message broker) are
//! external collaborators per §1's Non-goals on third-party integrations.
//! [`InMemoryBroker`] is the one concrete transport this crate ships,
//! primarily for tests and single-process pipelines; production transports
//! implement [`Publisher`]/[`Subscriber`] the same way.

use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{StreamError, StreamResult};

pub trait Publisher: Send + Sync {
    fn publish(&self, bytes: &[u8]) -> StreamResult<()>;
    fn close(&self) -> StreamResult<()> {
        Ok(())
    }
}

pub trait Subscriber: Send + Sync {
    /// Blocks until a message arrives, the topic is closed, or an error
    /// occurs. `Ok(None)` means the topic was closed and no more messages
    /// will arrive.
    fn recv(&self) -> StreamResult<Option<Vec<u8>>>;
    fn close(&self) -> StreamResult<()> {
        Ok(())
    }
}

const CHANNEL_CAPACITY: usize = 1024;

/// A single-process broadcast broker: every subscriber registered on a
/// topic before a `publish` receives a copy of that message. Subscribers
/// that register afterward do not see earlier messages (no replay).
#[derive(Default)]
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, Vec<SyncSender<Vec<u8>>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publisher(self: &Arc<Self>, topic: impl Into<String>) -> InMemoryPublisher {
        InMemoryPublisher {
            broker: self.clone(),
            topic: topic.into(),
        }
    }

    pub fn subscriber(self: &Arc<Self>, topic: impl Into<String>) -> InMemorySubscriber {
        let topic = topic.into();
        let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
        self.topics.lock().entry(topic.clone()).or_default().push(tx);
        InMemorySubscriber { rx: Mutex::new(rx) }
    }

    fn publish(&self, topic: &str, bytes: &[u8]) {
        let mut topics = self.topics.lock();
        if let Some(senders) = topics.get_mut(topic) {
            senders.retain_mut(|tx| match tx.try_send(bytes.to_vec()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }
}

pub struct InMemoryPublisher {
    broker: Arc<InMemoryBroker>,
    topic: String,
}

impl Publisher for InMemoryPublisher {
    fn publish(&self, bytes: &[u8]) -> StreamResult<()> {
        self.broker.publish(&self.topic, bytes);
        Ok(())
    }
}

pub struct InMemorySubscriber {
    rx: Mutex<Receiver<Vec<u8>>>,
}

impl Subscriber for InMemorySubscriber {
    fn recv(&self) -> StreamResult<Option<Vec<u8>>> {
        match self.rx.lock().recv() {
            Ok(bytes) => Ok(Some(bytes)),
            Err(_) => Ok(None),
        }
    }
}

impl From<std::sync::mpsc::SendError<Vec<u8>>> for StreamError {
    fn from(e: std::sync::mpsc::SendError<Vec<u8>>) -> Self {
        StreamError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_messages_published_after_it_registers() {
        let broker = InMemoryBroker::new();
        let sub = broker.subscriber("topic-a");
        let pub_ = broker.publisher("topic-a");
        pub_.publish(b"hello").unwrap();
        assert_eq!(sub.recv().unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn fans_out_to_every_subscriber_on_the_topic() {
        let broker = InMemoryBroker::new();
        let sub1 = broker.subscriber("fanout");
        let sub2 = broker.subscriber("fanout");
        broker.publisher("fanout").publish(b"x").unwrap();
        assert_eq!(sub1.recv().unwrap(), Some(b"x".to_vec()));
        assert_eq!(sub2.recv().unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn different_topics_do_not_cross_talk() {
        let broker = InMemoryBroker::new();
        let sub_a = broker.subscriber("a");
        broker.publisher("b").publish(b"for-b").unwrap();
        // a has nothing queued; drop the broker side instead of blocking.
        drop(broker);
        assert_eq!(sub_a.recv().unwrap(), None);
    }
}
