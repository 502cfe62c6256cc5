//! Application handle.
//!
//! An [`App`] ties together the broker, the codec registry and the
//! runtime configuration, and is the factory for topics and actors.
//! Cloning is cheap; every topic and actor created from one app shares
//! the same broker.

use crate::actor::ActorBuilder;
use crate::broker::LocalBroker;
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::topic::Topic;
use rill_protocol::{CodecRegistry, Record, TopicValue};
use std::sync::Arc;

#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    name: String,
    broker: LocalBroker,
    codecs: Arc<CodecRegistry>,
    config: RuntimeConfig,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, RuntimeConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: RuntimeConfig) -> Self {
        Self::with_codecs(name, config, CodecRegistry::default())
    }

    /// Build an app with extra codecs registered up front.
    ///
    /// Codec registration is a startup-time step; the registry is
    /// immutable once the app exists.
    pub fn with_codecs(
        name: impl Into<String>,
        config: RuntimeConfig,
        codecs: CodecRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(AppInner {
                name: name.into(),
                broker: LocalBroker::with_config(&config),
                codecs: Arc::new(codecs),
                config,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn broker(&self) -> &LocalBroker {
        &self.inner.broker
    }

    pub fn codecs(&self) -> Arc<CodecRegistry> {
        Arc::clone(&self.inner.codecs)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Typed handle over a broker topic
    pub fn topic<V: Record>(&self, name: impl Into<String>) -> Topic<V> {
        Topic::new(self.clone(), name)
    }

    /// Declare an actor processing the given topic
    pub fn actor<V: Record>(&self, name: impl Into<String>) -> ActorBuilder<V> {
        ActorBuilder::new(self.clone(), name)
    }

    /// Publish to a topic known only by name.
    ///
    /// This is the primitive reply routing needs: the destination comes
    /// from a request envelope, not from a declared topic handle.
    pub async fn send_to<V: Record>(
        &self,
        destination: &str,
        key: Option<String>,
        value: TopicValue<V>,
    ) -> Result<()> {
        self.topic::<V>(destination)
            .send(key, value, None, None, None, true)
            .await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("name", &self.inner.name).finish()
    }
}
