//! Typed topic handles.
//!
//! A [`Topic`] is a cheap, typed handle over one broker topic name. It
//! owns the codec choice for keys and values and is where messages get
//! encoded on the way in and subscriptions get opened on the way out.

use crate::app::App;
use crate::broker::Delivery;
use crate::error::Result;
use crate::source::Source;
use rill_protocol::{dumps, CodecError, Record, TopicValue};
use std::marker::PhantomData;

pub struct Topic<V: Record> {
    app: App,
    name: String,
    key_codec: Option<String>,
    value_codec: Option<String>,
    _marker: PhantomData<fn() -> V>,
}

impl<V: Record> Clone for Topic<V> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            name: self.name.clone(),
            key_codec: self.key_codec.clone(),
            value_codec: self.value_codec.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: Record> Topic<V> {
    pub(crate) fn new(app: App, name: impl Into<String>) -> Self {
        Self {
            app,
            name: name.into(),
            key_codec: None,
            value_codec: None,
            _marker: PhantomData,
        }
    }

    /// Default codec chain for keys on this topic
    pub fn with_key_codec(mut self, codec: impl Into<String>) -> Self {
        self.key_codec = Some(codec.into());
        self
    }

    /// Default codec chain for values on this topic
    pub fn with_value_codec(mut self, codec: impl Into<String>) -> Self {
        self.value_codec = Some(codec.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish one message.
    ///
    /// Per-call codec names override the topic defaults. `wait = true`
    /// suspends until every subscription queue accepts the message;
    /// `wait = false` only queues and fails on a full queue instead of
    /// applying backpressure.
    pub async fn send(
        &self,
        key: Option<String>,
        value: TopicValue<V>,
        partition: Option<u32>,
        key_codec: Option<&str>,
        value_codec: Option<&str>,
        wait: bool,
    ) -> Result<()> {
        let delivery = self.encode(key, &value, partition, key_codec, value_codec)?;
        if wait {
            self.app.broker().publish(&self.name, delivery).await?;
        } else {
            self.app.broker().publish_queued(&self.name, delivery)?;
        }
        Ok(())
    }

    /// Publish a plain value with the topic's default codecs
    pub async fn send_value(
        &self,
        key: Option<String>,
        value: V,
        partition: Option<u32>,
    ) -> Result<()> {
        self.send(key, TopicValue::Plain(value), partition, None, None, true)
            .await
    }

    /// Fire-and-forget publish: never suspends, never returns an error.
    ///
    /// Failures (no subscribers, full queue, encoding) surface only in
    /// the log, outside the caller's control flow.
    pub fn send_soon(&self, key: Option<String>, value: TopicValue<V>, partition: Option<u32>) {
        let result = self
            .encode(key, &value, partition, None, None)
            .and_then(|delivery| self.app.broker().publish_queued(&self.name, delivery));
        if let Err(err) = result {
            tracing::warn!(topic = %self.name, error = %err, "fire-and-forget send failed");
        }
    }

    /// Open a new subscription over this topic
    pub fn open_stream(&self) -> Source<V> {
        let rx = self.app.broker().subscribe(&self.name);
        Source::new(
            self.name.clone(),
            rx,
            self.app.codecs(),
            self.key_codec.clone(),
            self.value_codec.clone(),
        )
    }

    fn encode(
        &self,
        key: Option<String>,
        value: &TopicValue<V>,
        partition: Option<u32>,
        key_codec: Option<&str>,
        value_codec: Option<&str>,
    ) -> Result<Delivery> {
        let codecs = self.app.codecs();
        let value_codec = value_codec.or(self.value_codec.as_deref());
        let key_codec = key_codec.or(self.key_codec.as_deref());

        let value_json = serde_json::to_value(value).map_err(CodecError::Json)?;
        let payload = dumps(&codecs, value_codec, &value_json)?;

        let key = key
            .map(|k| dumps(&codecs, key_codec, &serde_json::Value::String(k)))
            .transpose()?;

        Ok(Delivery {
            key,
            payload,
            partition,
        })
    }
}

impl<V: Record> std::fmt::Debug for Topic<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("key_codec", &self.key_codec)
            .field("value_codec", &self.value_codec)
            .finish()
    }
}
