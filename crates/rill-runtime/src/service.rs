//! Service lifecycle contract.
//!
//! Actor instances and the actor service both expose start/stop through
//! this trait so an outer supervisor can drive them uniformly.

use crate::error::Result;
use async_trait::async_trait;

/// Lifecycle states, in transition order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Starting,
    Running,
    Stopping,
    /// Terminal
    Stopped,
}

impl ServiceState {
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ServiceState::Stopped)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceState::Created => "created",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

#[async_trait]
pub trait Service: Send {
    /// Transition Created → Running
    async fn start(&mut self) -> Result<()>;

    /// Transition Running → Stopped. Idempotent.
    async fn stop(&mut self);

    fn state(&self) -> ServiceState;

    /// Human-readable identifier for logs
    fn label(&self) -> String;
}
