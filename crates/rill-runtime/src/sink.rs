//! Downstream sinks.
//!
//! A sink consumes every value a sequence handler yields. The two
//! implementations cover the two kinds of callables a sink can be: a
//! plain function and a suspending one. The choice is made once at
//! registration time, not per call.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

#[async_trait]
pub trait Sink<V>: Send + Sync {
    async fn deliver(&self, value: &V) -> Result<()>;
}

/// Sink wrapping a plain function; never suspends
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<V, F> Sink<V> for FnSink<F>
where
    V: Send + Sync,
    F: Fn(&V) -> Result<()> + Send + Sync,
{
    async fn deliver(&self, value: &V) -> Result<()> {
        (self.f)(value)
    }
}

/// Sink wrapping a suspending function
pub struct FutureSink<F> {
    f: F,
}

impl<F> FutureSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<V, F> Sink<V> for FutureSink<F>
where
    V: Send + Sync,
    F: for<'a> Fn(&'a V) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    async fn deliver(&self, value: &V) -> Result<()> {
        (self.f)(value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fn_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            FnSink::new(move |v: &u32| {
                seen.lock().push(*v);
                Ok(())
            })
        };

        sink.deliver(&1).await.unwrap();
        sink.deliver(&2).await.unwrap();
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    // Pins the closure's inferred type to the higher-ranked signature
    // that `Sink for FutureSink` requires; closure inference alone
    // settles on a single concrete lifetime and fails the bound.
    fn constrain<F>(f: F) -> F
    where
        F: for<'a> Fn(&'a u32) -> BoxFuture<'a, Result<()>>,
    {
        f
    }

    #[tokio::test]
    async fn test_future_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            FutureSink::new(constrain(move |v: &u32| {
                let seen = Arc::clone(&seen);
                let v = *v;
                async move {
                    tokio::task::yield_now().await;
                    seen.lock().push(v);
                    Ok(())
                }
                .boxed()
            }))
        };

        sink.deliver(&7).await.unwrap();
        assert_eq!(*seen.lock(), vec![7]);
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let sink = FnSink::new(|_: &u32| Err(RuntimeError::sink(anyhow::anyhow!("down"))));
        let err = sink.deliver(&1).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Sink(_)));
    }
}
