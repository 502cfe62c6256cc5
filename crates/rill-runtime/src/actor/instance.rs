//! One concurrent replica of an actor.
//!
//! An instance owns exactly one background task. The task body is the
//! handler's result, classified once at invocation into one of the two
//! [`ActorBody`] shapes; the instance state machine is the same for
//! both.

use crate::actor::supervision::{supervise, TaskOutcome};
use crate::actor::Actor;
use crate::error::Result;
use crate::service::{Service, ServiceState};
use crate::source::Source;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{BoxStream, StreamExt};
use futures::{Future, Stream};
use rill_protocol::Record;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// The two shapes a handler result can take.
///
/// The invocation path tags the shape; nothing downstream probes the
/// value's capabilities at runtime.
pub enum ActorBody<V> {
    /// One bounded computation; the task ends when it resolves
    Single(BoxFuture<'static, Result<()>>),
    /// An open-ended sequence of values; each is drained into the sink
    /// chain before the next is pulled
    Sequence(BoxStream<'static, Result<V>>),
}

impl<V> ActorBody<V> {
    pub fn single(fut: impl Future<Output = Result<()>> + Send + 'static) -> Self {
        Self::Single(fut.boxed())
    }

    pub fn sequence(stream: impl Stream<Item = Result<V>> + Send + 'static) -> Self {
        Self::Sequence(stream.boxed())
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

impl<V> std::fmt::Debug for ActorBody<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(_) => write!(f, "ActorBody::Single"),
            Self::Sequence(_) => write!(f, "ActorBody::Sequence"),
        }
    }
}

/// State machine: Created → Starting → Running → Stopping → Stopped.
///
/// Created by [`Actor::invoke`]; the task is spawned by
/// [`Actor::start_task`] before `start` is called. `start` asserts the
/// task handle exists — a missing handle is a programming defect, not a
/// recoverable error.
pub struct ActorInstance<V: Record> {
    actor: Actor<V>,
    stream: Source<V>,
    body: Option<ActorBody<V>>,
    task: Option<JoinHandle<TaskOutcome>>,
    cancel: CancellationToken,
    index: Option<usize>,
    state: ServiceState,
}

impl<V: Record> ActorInstance<V> {
    pub(crate) fn new(actor: Actor<V>, stream: Source<V>, body: ActorBody<V>) -> Self {
        Self {
            actor,
            stream,
            body: Some(body),
            task: None,
            cancel: CancellationToken::new(),
            index: None,
            state: ServiceState::Created,
        }
    }

    /// Replica ordinal within the owning actor service
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = Some(index);
    }

    /// The per-invocation handle over the actor's shared source
    pub fn stream(&self) -> &Source<V> {
        &self.stream
    }

    pub fn actor(&self) -> &Actor<V> {
        &self.actor
    }

    /// True once the background task has been spawned
    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// Re-expose the handler result for composition instead of running
    /// it as a task. Only available before the task is spawned.
    pub fn into_body(mut self) -> Option<ActorBody<V>> {
        self.body.take()
    }

    /// Spawn the supervised background task
    pub(crate) fn spawn(&mut self) {
        if let Some(body) = self.body.take() {
            let fut = supervise(self.actor.clone(), body, self.cancel.clone());
            self.task = Some(tokio::spawn(fut));
        }
    }

    /// Request cancellation without waiting for the task to wind down
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Await the task's outcome without cancelling it.
    ///
    /// For single-result handlers this is "await the instance"; the
    /// outcome forwards the wrapped computation's ending.
    pub async fn join(&mut self) -> Option<TaskOutcome> {
        match self.task.take() {
            Some(task) => task.await.ok(),
            None => None,
        }
    }
}

#[async_trait]
impl<V: Record> Service for ActorInstance<V> {
    async fn start(&mut self) -> Result<()> {
        self.state = ServiceState::Starting;
        assert!(
            self.task.is_some(),
            "actor instance has no task handle at start"
        );
        self.state = ServiceState::Running;
        tracing::debug!(
            actor = %self.actor.name(),
            index = ?self.index,
            "replica running"
        );
        Ok(())
    }

    async fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        self.state = ServiceState::Stopping;
        // Cancellation, not drain: the handler iterates an unbounded
        // source and would otherwise never come back.
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match timeout(self.actor.app().config().stop_timeout, task).await {
                Ok(Ok(outcome)) => match outcome {
                    TaskOutcome::Cancelled | TaskOutcome::Completed => {
                        tracing::debug!(
                            actor = %self.actor.name(),
                            index = ?self.index,
                            "replica stopped"
                        );
                    }
                    TaskOutcome::Failed(err) => {
                        tracing::warn!(
                            actor = %self.actor.name(),
                            index = ?self.index,
                            error = %err,
                            "replica had already failed before stop"
                        );
                    }
                },
                Ok(Err(join_err)) => {
                    if join_err.is_panic() {
                        tracing::error!(
                            actor = %self.actor.name(),
                            index = ?self.index,
                            "replica task panicked"
                        );
                    }
                }
                Err(_) => {
                    abort.abort();
                    tracing::warn!(
                        actor = %self.actor.name(),
                        index = ?self.index,
                        "replica did not stop in time, aborted"
                    );
                }
            }
        }
        self.state = ServiceState::Stopped;
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn label(&self) -> String {
        match self.index {
            Some(i) => format!("{}-{}", self.actor.label(), i),
            None => self.actor.label(),
        }
    }
}
