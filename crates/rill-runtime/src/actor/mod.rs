//! Actors: named, concurrently-replicated topic processors.
//!
//! An [`Actor`] is the long-lived definition: a handler function bound
//! to a topic, a concurrency degree, a sink chain and an optional error
//! hook. It acts as the factory for replica instances and as the public
//! send/cast/ask/reply surface.
//!
//! All replicas of one actor share ONE source over the bound topic.
//! The source is opened lazily, at most once, and each replica holds a
//! clone of the same handle — replicas are competing consumers, never
//! independent readers.
//!
//! # Example
//!
//! ```rust,ignore
//! let app = App::new("orders");
//! let actor = app
//!     .actor::<Order>("order-counter")
//!     .concurrency(3)
//!     .sink(Arc::new(FnSink::new(|order: &Order| { ...; Ok(()) })))
//!     .handler(|source| ActorBody::Sequence(source.values()));
//!
//! let mut service = actor.service();
//! service.start().await?;
//! ```

mod instance;
mod service;
mod supervision;

pub use instance::{ActorBody, ActorInstance};
pub use service::ActorService;
pub use supervision::TaskOutcome;

use crate::app::App;
use crate::error::{Result, RuntimeError};
use crate::sink::Sink;
use crate::source::Source;
use crate::topic::Topic;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use rill_protocol::{Record, ReqRepRequest, ReqRepResponse, TopicValue};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Handler function: given the shared source, produce the replica body
pub type Handler<V> = Arc<dyn Fn(Source<V>) -> ActorBody<V> + Send + Sync>;

/// Error hook: observes a failure before the task is marked failed
pub type ErrorHook<V> =
    Arc<dyn for<'a> Fn(Actor<V>, &'a RuntimeError) -> BoxFuture<'a, ()> + Send + Sync>;

struct ActorInner<V: Record> {
    name: String,
    app: App,
    topic: Topic<V>,
    handler: Handler<V>,
    concurrency: usize,
    sinks: RwLock<Vec<Arc<dyn Sink<V>>>>,
    on_error: Option<ErrorHook<V>>,
    source: OnceCell<Source<V>>,
}

pub struct Actor<V: Record> {
    inner: Arc<ActorInner<V>>,
}

impl<V: Record> Clone for Actor<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Record> Actor<V> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn app(&self) -> &App {
        &self.inner.app
    }

    pub fn topic(&self) -> &Topic<V> {
        &self.inner.topic
    }

    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    pub fn label(&self) -> String {
        format!("actor:{}", self.inner.name)
    }

    pub(crate) fn error_hook(&self) -> Option<ErrorHook<V>> {
        self.inner.on_error.clone()
    }

    /// The one shared source over the bound topic.
    ///
    /// Opened at most once even under concurrent first access; every
    /// caller gets a clone of the same pull handle.
    pub async fn source(&self) -> Source<V> {
        self.inner
            .source
            .get_or_init(|| async { self.inner.topic.open_stream() })
            .await
            .clone()
    }

    /// Call the handler with the shared source and wrap the classified
    /// result in a replica instance. Does not spawn a task.
    pub async fn invoke(&self) -> ActorInstance<V> {
        let source = self.source().await;
        let body = (self.inner.handler)(source.clone());
        ActorInstance::new(self.clone(), source, body)
    }

    /// Invoke the handler and spawn its supervised background task for
    /// the given replica index
    pub async fn start_task(&self, index: usize) -> ActorInstance<V> {
        let mut instance = self.invoke().await;
        instance.set_index(index);
        instance.spawn();
        instance
    }

    /// Build the service supervising this actor's replica set
    pub fn service(&self) -> ActorService<V> {
        ActorService::new(self.clone())
    }

    /// Append a sink; invocation order is registration order.
    ///
    /// Meant for setup time — there is no synchronization against
    /// replicas already draining values.
    pub fn add_sink(&self, sink: Arc<dyn Sink<V>>) {
        self.inner.sinks.write().push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.read().len()
    }

    /// Fan a value out to every sink in registration order.
    ///
    /// No isolation: the first failing sink aborts the rest for this
    /// value and the failure propagates to the consumption loop.
    pub async fn delegate_to_sinks(&self, value: &V) -> Result<()> {
        let sinks: Vec<_> = self.inner.sinks.read().clone();
        for sink in sinks {
            sink.deliver(value).await?;
        }
        Ok(())
    }

    /// Publish a plain value to the actor's topic.
    ///
    /// Codec names override the topic defaults for this call only.
    pub async fn send(
        &self,
        key: Option<String>,
        value: V,
        partition: Option<u32>,
        key_codec: Option<&str>,
        value_codec: Option<&str>,
        wait: bool,
    ) -> Result<()> {
        self.inner
            .topic
            .send(
                key,
                TopicValue::Plain(value),
                partition,
                key_codec,
                value_codec,
                wait,
            )
            .await
    }

    /// Fire-and-forget publish; errors surface only in the log
    pub fn send_soon(&self, key: Option<String>, value: V, partition: Option<u32>) {
        self.inner
            .topic
            .send_soon(key, TopicValue::Plain(value), partition);
    }

    /// Send when no response is expected
    pub async fn cast(&self, key: Option<String>, value: V, partition: Option<u32>) -> Result<()> {
        self.send(key, value, partition, None, None, true).await
    }

    /// Send a request envelope and return a promise for its reply.
    ///
    /// A missing correlation id gets a freshly generated one. The
    /// promise carries no waiting mechanism: matching an incoming
    /// response to a pending caller is not implemented yet, and the
    /// promise exists so callers keep a handle on the correlation data.
    pub async fn ask(
        &self,
        key: Option<String>,
        value: V,
        partition: Option<u32>,
        reply_to: Option<String>,
        correlation_id: Option<String>,
    ) -> Result<ReplyPromise<V>> {
        let correlation_id =
            correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let req = ReqRepRequest::new(value, reply_to, correlation_id);
        self.inner
            .topic
            .send(
                key,
                TopicValue::Request(req.clone()),
                partition,
                None,
                None,
                true,
            )
            .await?;
        Ok(ReplyPromise {
            actor: self.clone(),
            req,
        })
    }

    /// Send a response envelope to the request's reply destination,
    /// copying its correlation id
    pub async fn reply(
        &self,
        key: Option<String>,
        value: V,
        req: &ReqRepRequest<V>,
    ) -> Result<()> {
        let destination = req
            .reply_to
            .as_deref()
            .ok_or(RuntimeError::NoReplyDestination)?;
        let resp = ReqRepResponse::new(value, req.correlation_id.clone());
        self.inner
            .app
            .send_to(destination, key, TopicValue::Response(resp))
            .await
    }
}

impl<V: Record> std::fmt::Debug for Actor<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.inner.name)
            .field("topic", &self.inner.topic.name())
            .field("concurrency", &self.inner.concurrency)
            .finish()
    }
}

/// Handle returned by [`Actor::ask`], correlating the caller to its
/// pending request.
///
/// Waiting for the response is not implemented; the promise only keeps
/// the request (and its correlation id) reachable for the caller.
pub struct ReplyPromise<V: Record> {
    actor: Actor<V>,
    req: ReqRepRequest<V>,
}

impl<V: Record> ReplyPromise<V> {
    pub fn actor(&self) -> &Actor<V> {
        &self.actor
    }

    pub fn request(&self) -> &ReqRepRequest<V> {
        &self.req
    }

    pub fn correlation_id(&self) -> &str {
        &self.req.correlation_id
    }
}

impl<V: Record> std::fmt::Debug for ReplyPromise<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPromise")
            .field("actor", &self.actor.name())
            .field("correlation_id", &self.req.correlation_id)
            .finish()
    }
}

/// Declares an actor on an [`App`]
pub struct ActorBuilder<V: Record> {
    app: App,
    name: String,
    topic: Option<Topic<V>>,
    concurrency: usize,
    sinks: Vec<Arc<dyn Sink<V>>>,
    on_error: Option<ErrorHook<V>>,
}

impl<V: Record> ActorBuilder<V> {
    pub(crate) fn new(app: App, name: impl Into<String>) -> Self {
        Self {
            app,
            name: name.into(),
            topic: None,
            concurrency: 1,
            sinks: Vec::new(),
            on_error: None,
        }
    }

    /// Bind to a topic by name; defaults to the actor's own name
    pub fn topic(mut self, name: impl Into<String>) -> Self {
        self.topic = Some(self.app.topic(name));
        self
    }

    /// Bind to an already-configured topic handle
    pub fn with_topic(mut self, topic: Topic<V>) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Number of concurrent replicas; must be at least 1
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        assert!(concurrency >= 1, "actor concurrency must be at least 1");
        self.concurrency = concurrency;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink<V>>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Hook invoked with (actor, error) when a replica task fails
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(Actor<V>, &'a RuntimeError) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Finish the declaration with the handler function
    pub fn handler<F>(self, handler: F) -> Actor<V>
    where
        F: Fn(Source<V>) -> ActorBody<V> + Send + Sync + 'static,
    {
        let topic = self
            .topic
            .unwrap_or_else(|| self.app.topic(self.name.clone()));
        Actor {
            inner: Arc::new(ActorInner {
                name: self.name,
                app: self.app,
                topic,
                handler: Arc::new(handler),
                concurrency: self.concurrency,
                sinks: RwLock::new(self.sinks),
                on_error: self.on_error,
                source: OnceCell::new(),
            }),
        }
    }
}
