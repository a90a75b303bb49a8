//! Per-agent worker scheduler.
//!
//! Each running agent gets exactly one worker: a tokio task that polls the
//! agent's backlog at a fixed interval and executes tasks oldest-first
//! through the [`TaskExecutor`]. Workers for different agents run
//! concurrently; within one agent, execution is strictly serial.
//!
//! [`WorkerRegistry`] owns every worker handle. `start` is idempotent (at
//! most one live loop per agent id) and `stop` only flips a watch channel:
//! the loop exits after the current unit of work, never interrupting an
//! in-flight executor call.
//!
//! Failure semantics: executor errors are recorded on the failed task and
//! never terminate the loop; store errors are logged and retried on the
//! next poll.
//!
//! Workers write only the agent's `current_task` field; lifecycle status
//! belongs to the registry, so a stop issued mid-task is never overwritten
//! when the in-flight task finishes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::executor::TaskExecutor;
use crate::store::{Store, StoreResult};
use crate::types::{AgentId, AgentStatus, TaskStatus};

struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    fn is_live(&self) -> bool {
        !*self.shutdown.borrow() && !self.task.is_finished()
    }
}

/// Owns one cancellable worker task per running agent.
pub struct WorkerRegistry {
    store: Arc<dyn Store>,
    executor: Arc<dyn TaskExecutor>,
    config: WorkerConfig,
    workers: Mutex<HashMap<AgentId, WorkerHandle>>,
}

impl WorkerRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        executor: Arc<dyn TaskExecutor>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            executor,
            config,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Start the worker for an agent. Idempotent: if a live loop already
    /// exists for this agent id, nothing happens. If a stopped loop is
    /// still draining its in-flight task, waits for it to exit first so
    /// execution stays serial within the agent.
    pub async fn start(&self, agent_id: AgentId) {
        let mut workers = self.workers.lock().await;
        if let Some(handle) = workers.remove(&agent_id) {
            if handle.is_live() {
                debug!(agent_id, "worker already running");
                workers.insert(agent_id, handle);
                return;
            }
            let _ = handle.task.await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = self.store.clone();
        let executor = self.executor.clone();
        let poll_interval = self.config.poll_interval;
        let task = tokio::spawn(async move {
            worker_loop(agent_id, store, executor, poll_interval, shutdown_rx).await;
        });

        workers.insert(
            agent_id,
            WorkerHandle {
                shutdown: shutdown_tx,
                task,
            },
        );
        info!(agent_id, "worker started");
    }

    /// Signal an agent's worker to exit after its current unit of work.
    /// Does not wait for the loop to finish and never cancels an in-flight
    /// executor call. The handle stays registered until the next `start`,
    /// which drains the old loop before spawning a replacement.
    pub async fn stop(&self, agent_id: AgentId) {
        let workers = self.workers.lock().await;
        if let Some(handle) = workers.get(&agent_id) {
            let _ = handle.shutdown.send(true);
            info!(agent_id, "worker stop requested");
        }
    }

    /// Whether a live worker exists for this agent. A worker that has been
    /// told to stop counts as inactive even while it drains.
    pub async fn is_active(&self, agent_id: AgentId) -> bool {
        let workers = self.workers.lock().await;
        workers
            .get(&agent_id)
            .map(WorkerHandle::is_live)
            .unwrap_or(false)
    }

    /// Number of live workers.
    pub async fn active_count(&self) -> usize {
        let workers = self.workers.lock().await;
        workers.values().filter(|h| h.is_live()).count()
    }

    /// Signal every worker to stop.
    pub async fn shutdown_all(&self) {
        let workers = self.workers.lock().await;
        for (agent_id, handle) in workers.iter() {
            let _ = handle.shutdown.send(true);
            debug!(agent_id = *agent_id, "worker stop requested");
        }
    }
}

async fn worker_loop(
    agent_id: AgentId,
    store: Arc<dyn Store>,
    executor: Arc<dyn TaskExecutor>,
    poll_interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if *shutdown.borrow() {
            break;
        }

        // Transient store errors must not kill the loop.
        if let Err(e) = run_tick(agent_id, store.as_ref(), executor.as_ref()).await {
            warn!(agent_id, error = %e, "worker tick failed; retrying next poll");
        }
    }

    debug!(agent_id, "worker loop exited");
}

/// One scheduling tick: claim the oldest runnable task and execute it.
async fn run_tick(
    agent_id: AgentId,
    store: &dyn Store,
    executor: &dyn TaskExecutor,
) -> StoreResult<()> {
    let Some(agent) = store.agent(agent_id).await? else {
        return Ok(());
    };
    if agent.status != AgentStatus::Running {
        return Ok(());
    }

    let Some(mut task) = store.next_claimable_task(agent_id).await? else {
        if agent.current_task.is_some() {
            store.set_current_task(agent_id, None).await?;
        }
        return Ok(());
    };

    if task.status == TaskStatus::Pending {
        // Persist the claim before executing so a crash mid-task leaves an
        // observable in_progress row.
        task.status = TaskStatus::InProgress;
        store.update_task(task.clone()).await?;
        store
            .set_current_task(agent_id, Some(task.description.clone()))
            .await?;
    }

    match executor.execute(&task.description).await {
        Ok(result) => {
            task.status = TaskStatus::Completed;
            task.result = Some(result);
        }
        Err(e) => {
            task.status = TaskStatus::Failed;
            task.result = Some(format!("Error: {e}"));
        }
    }
    task.completed_at = Some(Utc::now());
    store.update_task(task).await?;
    store.set_current_task(agent_id, None).await?;

    Ok(())
}
