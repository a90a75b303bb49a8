//! Agent registry and task queue operations.
//!
//! [`AgentService`] is the source of truth for agent lifecycle status and
//! the only place tasks enter the system. Starting an agent flips its row
//! to running and spins up its worker through the [`WorkerRegistry`];
//! stopping does the reverse without interrupting in-flight work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::Store;
use crate::types::{
    Agent, AgentId, AgentStatus, EvolutionError, Result, Task,
};
use crate::worker::WorkerRegistry;

/// An agent together with its full task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub agent: Agent,
    pub tasks: Vec<Task>,
}

/// Manages agent registration, lifecycle and task assignment.
pub struct AgentService {
    store: Arc<dyn Store>,
    workers: Arc<WorkerRegistry>,
}

impl AgentService {
    pub fn new(store: Arc<dyn Store>, workers: Arc<WorkerRegistry>) -> Self {
        Self { store, workers }
    }

    /// Register a new agent. Agents start idle; their worker is only
    /// spawned by [`AgentService::start`].
    pub async fn register(
        &self,
        name: impl Into<String>,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> Result<Agent> {
        let agent = self.store.create_agent(name.into(), avatar_url, role).await?;
        info!(agent_id = agent.id, name = %agent.name, "agent registered");
        Ok(agent)
    }

    /// Mark an agent running and start its worker. Safe to call on an
    /// already-running agent.
    pub async fn start(&self, id: AgentId) -> Result<Agent> {
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))?;
        self.store.set_agent_status(id, AgentStatus::Running).await?;
        self.workers.start(id).await;
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))
    }

    /// Mark an agent stopped and signal its worker to exit after the
    /// current unit of work.
    pub async fn stop(&self, id: AgentId) -> Result<Agent> {
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))?;
        self.store.set_agent_status(id, AgentStatus::Stopped).await?;
        self.workers.stop(id).await;
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))
    }

    /// Remove an agent entirely, stopping its worker first.
    pub async fn remove(&self, id: AgentId) -> Result<()> {
        self.workers.stop(id).await;
        if !self.store.delete_agent(id).await? {
            return Err(EvolutionError::AgentNotFound(id));
        }
        info!(agent_id = id, "agent removed");
        Ok(())
    }

    /// Update the cosmetic profile fields. Fields passed as `None` are
    /// left untouched.
    pub async fn update_profile(
        &self,
        id: AgentId,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> Result<Agent> {
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))?;
        self.store.set_agent_profile(id, avatar_url, role).await?;
        self.store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))
    }

    /// Queue one task on an agent's backlog. Only running agents accept
    /// work.
    pub async fn assign_task(
        &self,
        agent_id: AgentId,
        description: impl Into<String>,
    ) -> Result<Task> {
        let agent = self
            .store
            .agent(agent_id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(agent_id))?;
        if agent.status != AgentStatus::Running {
            return Err(EvolutionError::InvalidState(format!(
                "agent {agent_id} must be running to accept tasks"
            )));
        }

        let task = self.store.create_task(agent_id, description.into()).await?;
        self.store.touch_agent(agent_id).await?;
        info!(agent_id, task_id = task.id, "task assigned");
        Ok(task)
    }

    /// Queue several tasks on one agent's backlog, preserving order.
    pub async fn assign_tasks(
        &self,
        agent_id: AgentId,
        descriptions: Vec<String>,
    ) -> Result<Vec<Task>> {
        let mut tasks = Vec::with_capacity(descriptions.len());
        for description in descriptions {
            tasks.push(self.assign_task(agent_id, description).await?);
        }
        Ok(tasks)
    }

    /// Queue the same task on every currently running agent. Agents that
    /// are idle or stopped are skipped.
    pub async fn broadcast_task(&self, description: impl Into<String>) -> Result<Vec<Task>> {
        let description = description.into();
        let mut tasks = Vec::new();
        for agent in self.store.agents().await? {
            if agent.status == AgentStatus::Running {
                tasks.push(self.assign_task(agent.id, description.clone()).await?);
            }
        }
        info!(count = tasks.len(), "task broadcast");
        Ok(tasks)
    }

    /// An agent together with its full task history.
    pub async fn status(&self, id: AgentId) -> Result<AgentStatusReport> {
        let agent = self
            .store
            .agent(id)
            .await?
            .ok_or(EvolutionError::AgentNotFound(id))?;
        let tasks = self.store.tasks_for_agent(id).await?;
        Ok(AgentStatusReport { agent, tasks })
    }

    /// All registered agents, ordered by id.
    pub async fn list(&self) -> Result<Vec<Agent>> {
        Ok(self.store.agents().await?)
    }
}
