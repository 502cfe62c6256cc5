//! In-process message broker.
//!
//! The broker owns one fan-out table per topic name. Each subscription is
//! a bounded mpsc queue; publishing delivers the encoded message to every
//! live subscription and fails fast when a topic has none. Messages cross
//! the broker already encoded by the codec chain, so the serialization
//! path is exercised on every send and receive.

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One encoded message as it crosses the broker
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Encoded partitioning key, if any
    pub key: Option<Vec<u8>>,
    /// Encoded message value
    pub payload: Vec<u8>,
    /// Explicit partition requested by the producer
    pub partition: Option<u32>,
}

struct TopicChannel {
    subscribers: RwLock<Vec<mpsc::Sender<Delivery>>>,
}

impl TopicChannel {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Drop closed senders and return the live set
    fn live_senders(&self) -> Vec<mpsc::Sender<Delivery>> {
        let mut subs = self.subscribers.write();
        subs.retain(|tx| !tx.is_closed());
        subs.clone()
    }
}

/// Topic-keyed fan-out of bounded subscription queues
#[derive(Clone)]
pub struct LocalBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    topics: DashMap<String, TopicChannel>,
    channel_capacity: usize,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    pub fn with_config(config: &RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: DashMap::new(),
                channel_capacity: config.channel_capacity,
            }),
        }
    }

    /// Create a new subscription queue for a topic
    pub fn subscribe(&self, topic: &str) -> mpsc::Receiver<Delivery> {
        let (tx, rx) = mpsc::channel(self.inner.channel_capacity);
        self.inner
            .topics
            .entry(topic.to_string())
            .or_insert_with(TopicChannel::new)
            .subscribers
            .write()
            .push(tx);
        tracing::debug!(topic = %topic, "new subscription");
        rx
    }

    /// Deliver to every subscription, suspending on full queues.
    ///
    /// Returns the number of subscriptions reached. Fails fast with
    /// `NoSubscribers` when the topic has no live subscription, so a lost
    /// message is an error the producer sees rather than a silent drop.
    pub async fn publish(&self, topic: &str, delivery: Delivery) -> Result<usize> {
        let senders = self.live_senders(topic)?;
        let mut delivered = 0;
        for tx in &senders {
            // Clone per subscription; senders were collected outside the lock
            tx.send(delivery.clone())
                .await
                .map_err(|_| RuntimeError::ChannelClosed {
                    topic: topic.to_string(),
                })?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Deliver to every subscription without suspending.
    ///
    /// A full queue is an error here, not a wait: the caller opted out of
    /// backpressure.
    pub fn publish_queued(&self, topic: &str, delivery: Delivery) -> Result<usize> {
        let senders = self.live_senders(topic)?;
        let mut delivered = 0;
        for tx in &senders {
            tx.try_send(delivery.clone()).map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => RuntimeError::ChannelFull {
                    topic: topic.to_string(),
                },
                mpsc::error::TrySendError::Closed(_) => RuntimeError::ChannelClosed {
                    topic: topic.to_string(),
                },
            })?;
            delivered += 1;
        }
        Ok(delivered)
    }

    fn live_senders(&self, topic: &str) -> Result<Vec<mpsc::Sender<Delivery>>> {
        let senders = self
            .inner
            .topics
            .get(topic)
            .map(|channel| channel.live_senders())
            .unwrap_or_default();
        if senders.is_empty() {
            return Err(RuntimeError::NoSubscribers {
                topic: topic.to_string(),
            });
        }
        Ok(senders)
    }

    /// Number of topics with at least one subscription ever created
    pub fn topic_count(&self) -> usize {
        self.inner.topics.len()
    }

    /// Number of live subscriptions for a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .get(topic)
            .map(|channel| channel.live_senders().len())
            .unwrap_or(0)
    }
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(payload: &[u8]) -> Delivery {
        Delivery {
            key: None,
            payload: payload.to_vec(),
            partition: None,
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let broker = LocalBroker::new();
        let mut rx = broker.subscribe("orders");

        let delivered = broker.publish("orders", delivery(b"v1")).await.unwrap();
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.payload, b"v1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let broker = LocalBroker::new();

        let err = broker.publish("nowhere", delivery(b"v")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NoSubscribers { topic } if topic == "nowhere"));
    }

    #[tokio::test]
    async fn test_fanout_to_all_subscriptions() {
        let broker = LocalBroker::new();
        let mut rx1 = broker.subscribe("orders");
        let mut rx2 = broker.subscribe("orders");

        let delivered = broker.publish("orders", delivery(b"v")).await.unwrap();
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().payload, b"v");
        assert_eq!(rx2.recv().await.unwrap().payload, b"v");
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let broker = LocalBroker::new();
        let rx1 = broker.subscribe("orders");
        let mut rx2 = broker.subscribe("orders");
        assert_eq!(broker.subscriber_count("orders"), 2);

        drop(rx1);
        let delivered = broker.publish("orders", delivery(b"v")).await.unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(broker.subscriber_count("orders"), 1);

        assert_eq!(rx2.recv().await.unwrap().payload, b"v");
    }

    #[tokio::test]
    async fn test_publish_queued_full_channel() {
        let config = RuntimeConfig {
            channel_capacity: 1,
            ..RuntimeConfig::default()
        };
        let broker = LocalBroker::with_config(&config);
        let _rx = broker.subscribe("orders");

        broker.publish_queued("orders", delivery(b"v1")).unwrap();
        let err = broker.publish_queued("orders", delivery(b"v2")).unwrap_err();
        assert!(matches!(err, RuntimeError::ChannelFull { .. }));
    }

    #[tokio::test]
    async fn test_topic_isolation() {
        let broker = LocalBroker::new();
        let mut orders = broker.subscribe("orders");
        let mut payments = broker.subscribe("payments");

        broker.publish("orders", delivery(b"o")).await.unwrap();
        broker.publish("payments", delivery(b"p")).await.unwrap();

        assert_eq!(orders.recv().await.unwrap().payload, b"o");
        assert_eq!(payments.recv().await.unwrap().payload, b"p");
        assert_eq!(broker.topic_count(), 2);
    }
}
