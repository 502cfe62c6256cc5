//! Pull-only stream handles over a topic subscription.
//!
//! A [`Source`] is the consuming side of one subscription queue. Clones
//! share the receiver behind an async mutex, so several replicas pulling
//! from clones of the same source form competing consumers: each message
//! is handed to exactly one puller, and the mutex-guarded pull is the
//! sole serialization point.

use crate::broker::Delivery;
use crate::error::Result;
use futures::stream::BoxStream;
use futures::StreamExt;
use rill_protocol::{loads, CodecError, CodecRegistry, Record, TopicValue};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// One decoded message pulled from a source
#[derive(Debug, Clone)]
pub struct Event<V> {
    pub key: Option<String>,
    pub value: TopicValue<V>,
    pub partition: Option<u32>,
}

struct SourceInner {
    topic: String,
    rx: Mutex<mpsc::Receiver<Delivery>>,
    codecs: Arc<CodecRegistry>,
    key_codec: Option<String>,
    value_codec: Option<String>,
}

/// Shared pull handle over one subscription
pub struct Source<V: Record> {
    inner: Arc<SourceInner>,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Record> Clone for Source<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<V: Record> Source<V> {
    pub(crate) fn new(
        topic: String,
        rx: mpsc::Receiver<Delivery>,
        codecs: Arc<CodecRegistry>,
        key_codec: Option<String>,
        value_codec: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                topic,
                rx: Mutex::new(rx),
                codecs,
                key_codec,
                value_codec,
            }),
            _marker: PhantomData,
        }
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    /// Pull the next message, or `None` when the topic channel closes.
    ///
    /// Concurrent callers on clones of one source compete: the receiver
    /// lock is held only for the pull itself, decoding happens outside it.
    pub async fn next(&self) -> Option<Result<Event<V>>> {
        let delivery = {
            let mut rx = self.inner.rx.lock().await;
            rx.recv().await?
        };
        Some(self.decode(delivery))
    }

    fn decode(&self, delivery: Delivery) -> Result<Event<V>> {
        let value_json = loads(
            &self.inner.codecs,
            self.inner.value_codec.as_deref(),
            &delivery.payload,
        )?;
        let value: TopicValue<V> =
            serde_json::from_value(value_json).map_err(CodecError::Json)?;

        let key = match delivery.key {
            Some(bytes) => {
                let key_json =
                    loads(&self.inner.codecs, self.inner.key_codec.as_deref(), &bytes)?;
                Some(match key_json {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
            }
            None => None,
        };

        Ok(Event {
            key,
            value,
            partition: delivery.partition,
        })
    }

    /// True when both handles pull from the same subscription
    pub fn same_source(a: &Source<V>, b: &Source<V>) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// All messages as a stream, envelopes included
    pub fn events(&self) -> BoxStream<'static, Result<Event<V>>> {
        let source = self.clone();
        futures::stream::unfold(source, |source| async move {
            source.next().await.map(|item| (item, source))
        })
        .boxed()
    }

    /// Plain values as a stream; request/reply envelopes are skipped.
    ///
    /// Decode failures still come through as errors so a handler loop
    /// built on this stream fails instead of silently dropping input.
    pub fn values(&self) -> BoxStream<'static, Result<V>> {
        let topic = self.inner.topic.clone();
        self.events()
            .filter_map(move |item| {
                let topic = topic.clone();
                async move {
                    match item {
                        Ok(event) => match event.value {
                            TopicValue::Plain(v) => Some(Ok(v)),
                            other => {
                                tracing::debug!(
                                    topic = %topic,
                                    is_request = other.is_request(),
                                    "skipping envelope on value stream"
                                );
                                None
                            }
                        },
                        Err(err) => Some(Err(err)),
                    }
                }
            })
            .boxed()
    }
}

impl<V: Record> std::fmt::Debug for Source<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("topic", &self.inner.topic)
            .finish()
    }
}
