//! Supervisor of one actor's replica set.
//!
//! Owns exactly `concurrency` instances. Replicas start sequentially in
//! index order but execute concurrently; they all pull from the actor's
//! one shared source, so each message lands on exactly one replica. A
//! failed replica is not replaced — restart policy belongs to whatever
//! drives this service.

use crate::actor::instance::ActorInstance;
use crate::actor::Actor;
use crate::error::Result;
use crate::service::{Service, ServiceState};
use async_trait::async_trait;
use rill_protocol::Record;

pub struct ActorService<V: Record> {
    actor: Actor<V>,
    instances: Vec<ActorInstance<V>>,
    state: ServiceState,
}

impl<V: Record> ActorService<V> {
    pub(crate) fn new(actor: Actor<V>) -> Self {
        Self {
            actor,
            instances: Vec::new(),
            state: ServiceState::Created,
        }
    }

    pub fn actor(&self) -> &Actor<V> {
        &self.actor
    }

    pub fn instances(&self) -> &[ActorInstance<V>] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [ActorInstance<V>] {
        &mut self.instances
    }
}

#[async_trait]
impl<V: Record> Service for ActorService<V> {
    async fn start(&mut self) -> Result<()> {
        self.state = ServiceState::Starting;
        tracing::info!(
            actor = %self.actor.name(),
            concurrency = self.actor.concurrency(),
            "starting actor service"
        );
        for index in 0..self.actor.concurrency() {
            let mut instance = self.actor.start_task(index).await;
            instance.start().await?;
            self.instances.push(instance);
        }
        self.state = ServiceState::Running;
        Ok(())
    }

    async fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        self.state = ServiceState::Stopping;
        tracing::info!(actor = %self.actor.name(), "stopping actor service");
        for instance in &mut self.instances {
            instance.stop().await;
        }
        self.state = ServiceState::Stopped;
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    fn label(&self) -> String {
        self.actor.label()
    }
}
