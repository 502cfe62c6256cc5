//! Task supervision.
//!
//! Every replica task runs inside [`supervise`], which is the single
//! place where cancellation, completion and failure are told apart.
//! Cancellation is a [`TaskOutcome`] variant, not an error, so nothing
//! downstream can mistake a shutdown for a crash.

use crate::actor::{Actor, ActorBody};
use crate::error::{Result, RuntimeError};
use futures::stream::BoxStream;
use futures::StreamExt;
use rill_protocol::Record;
use tokio_util::sync::CancellationToken;

/// How a replica task ended
#[derive(Debug)]
pub enum TaskOutcome {
    /// The handler finished on its own (single-result handlers, or a
    /// sequence that exhausted its source)
    Completed,
    /// Shutdown was requested; not a failure
    Cancelled,
    /// The handler or a sink raised; the error hook has already run
    Failed(RuntimeError),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }
}

/// Run a replica body under cancellation and failure reporting.
///
/// Cancellation wins at any suspension point and never reaches the
/// error hook. On failure the hook (if configured) runs to completion
/// before the outcome is marked failed, so the hook observes the error
/// while the task is still formally alive.
pub(crate) async fn supervise<V: Record>(
    actor: Actor<V>,
    body: ActorBody<V>,
    cancel: CancellationToken,
) -> TaskOutcome {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(actor = %actor.name(), "replica task cancelled");
            TaskOutcome::Cancelled
        }
        result = run_body(actor.clone(), body) => match result {
            Ok(()) => {
                tracing::debug!(actor = %actor.name(), "replica task completed");
                TaskOutcome::Completed
            }
            Err(err) => {
                if let Some(hook) = actor.error_hook() {
                    hook(actor.clone(), &err).await;
                }
                tracing::error!(actor = %actor.name(), error = %err, "replica task failed");
                TaskOutcome::Failed(err)
            }
        }
    }
}

async fn run_body<V: Record>(actor: Actor<V>, body: ActorBody<V>) -> Result<()> {
    match body {
        ActorBody::Single(fut) => fut.await,
        ActorBody::Sequence(stream) => slurp(actor, stream).await,
    }
}

/// Consumption loop for sequence handlers: pull a value, fan it out to
/// the sinks in registration order, pull the next. Ends only on stream
/// exhaustion, error, or cancellation of the surrounding task.
async fn slurp<V: Record>(actor: Actor<V>, mut stream: BoxStream<'static, Result<V>>) -> Result<()> {
    while let Some(item) = stream.next().await {
        let value = item?;
        tracing::debug!(actor = %actor.name(), value = ?value, "handler yielded value");
        actor.delegate_to_sinks(&value).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    fn idle_actor(app: &App) -> Actor<String> {
        app.actor::<String>("idle")
            .handler(|_source| ActorBody::single(async { Ok(()) }))
    }

    #[tokio::test]
    async fn test_completed_single_body() {
        let app = App::new("test");
        let actor = idle_actor(&app);

        let outcome = supervise(
            actor,
            ActorBody::single(async { Ok(()) }),
            CancellationToken::new(),
        )
        .await;
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_cancellation_wins_at_suspension_point() {
        let app = App::new("test");
        let actor = idle_actor(&app);
        let token = CancellationToken::new();

        let body = ActorBody::<String>::single(async {
            sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let task = tokio::spawn(supervise(actor, body, token.clone()));
        sleep(Duration::from_millis(50)).await;
        token.cancel();

        let outcome = task.await.unwrap();
        assert!(outcome.is_cancelled());
    }

    #[tokio::test]
    async fn test_failure_invokes_hook_once() {
        let app = App::new("test");
        let hook_calls = Arc::new(Mutex::new(Vec::new()));
        let actor = {
            let hook_calls = Arc::clone(&hook_calls);
            app.actor::<String>("failing")
                .on_error(move |actor, err| {
                    let hook_calls = Arc::clone(&hook_calls);
                    let name = actor.name().to_string();
                    let message = err.to_string();
                    async move {
                        hook_calls.lock().push((name, message));
                    }
                    .boxed()
                })
                .handler(|_source| ActorBody::single(async { Ok(()) }))
        };

        let body = ActorBody::<String>::single(async {
            Err(RuntimeError::handler(anyhow::anyhow!("boom")))
        });
        let outcome = supervise(actor, body, CancellationToken::new()).await;

        assert!(outcome.is_failed());
        let calls = hook_calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "failing");
        assert!(calls[0].1.contains("boom"));
    }

    #[tokio::test]
    async fn test_cancellation_never_reaches_hook() {
        let app = App::new("test");
        let hook_calls = Arc::new(Mutex::new(0u32));
        let actor = {
            let hook_calls = Arc::clone(&hook_calls);
            app.actor::<String>("quiet")
                .on_error(move |_actor, _err| {
                    let hook_calls = Arc::clone(&hook_calls);
                    async move {
                        *hook_calls.lock() += 1;
                    }
                    .boxed()
                })
                .handler(|_source| ActorBody::single(async { Ok(()) }))
        };

        let token = CancellationToken::new();
        let body = ActorBody::<String>::single(async {
            sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let task = tokio::spawn(supervise(actor, body, token.clone()));
        sleep(Duration::from_millis(50)).await;
        token.cancel();

        assert!(task.await.unwrap().is_cancelled());
        assert_eq!(*hook_calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_sequence_body_fans_out_in_order() {
        let app = App::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let actor = {
            let seen = Arc::clone(&seen);
            app.actor::<String>("collector")
                .sink(Arc::new(crate::sink::FnSink::new(move |v: &String| {
                    seen.lock().push(v.clone());
                    Ok(())
                })))
                .handler(|_source| ActorBody::single(async { Ok(()) }))
        };

        let body = ActorBody::Sequence(
            futures::stream::iter(vec![
                Ok("a".to_string()),
                Ok("b".to_string()),
                Ok("c".to_string()),
            ])
            .boxed(),
        );
        let outcome = supervise(actor, body, CancellationToken::new()).await;

        assert!(outcome.is_completed());
        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
    }
}
