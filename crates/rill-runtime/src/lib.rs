//! Rill runtime: supervised, concurrently-replicated stream processors.
//!
//! The runtime turns a message-handling function into an actor: a named
//! processor bound to one topic, replicated `concurrency` times over a
//! single shared source (competing consumers), with fan-out to
//! downstream sinks and a request/reply envelope protocol layered on
//! top of plain publish.
//!
//! Layers, bottom up:
//! - [`LocalBroker`]: in-process topic fan-out over bounded queues
//! - [`Topic`] / [`Source`]: typed publish and shared pull handles,
//!   with codec-chain encoding on both ends
//! - [`Sink`]: downstream consumers of handler output
//! - [`Actor`] / [`ActorInstance`] / [`ActorService`]: the definition,
//!   one replica's supervised task, and the supervisor of the replica
//!   set
//!
//! # Quick start
//!
//! ```rust,ignore
//! use rill_runtime::{ActorBody, App, FnSink, Service};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> rill_runtime::Result<()> {
//!     let app = App::new("orders");
//!     let actor = app
//!         .actor::<String>("printer")
//!         .concurrency(3)
//!         .sink(Arc::new(FnSink::new(|v: &String| {
//!             println!("{v}");
//!             Ok(())
//!         })))
//!         .handler(|source| ActorBody::Sequence(source.values()));
//!
//!     let mut service = actor.service();
//!     service.start().await?;
//!     actor.send(None, "hello".into(), None, None, None, true).await?;
//!     service.stop().await;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod app;
pub mod broker;
pub mod config;
pub mod error;
pub mod service;
pub mod sink;
pub mod source;
pub mod topic;

pub use actor::{
    Actor, ActorBody, ActorBuilder, ActorInstance, ActorService, ErrorHook, ReplyPromise,
    TaskOutcome,
};
pub use app::App;
pub use broker::{Delivery, LocalBroker};
pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
pub use service::{Service, ServiceState};
pub use sink::{FnSink, FutureSink, Sink};
pub use source::{Event, Source};
pub use topic::Topic;

// Protocol types most callers need alongside the runtime
pub use rill_protocol::{Record, ReqRepRequest, ReqRepResponse, TopicValue};
