//! Engine facade wiring every subsystem over one shared store.

use std::sync::Arc;

use crate::agents::AgentService;
use crate::analytics::EvolutionAnalytics;
use crate::analyzer::EvolutionAnalyzer;
use crate::assignment::AssignmentPolicy;
use crate::collaboration::CollaborationLedger;
use crate::config::{AnalyzerConfig, ConsensusConfig, WorkerConfig};
use crate::executor::{Advisor, TaskExecutor};
use crate::lifecycle::SuggestionLifecycle;
use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::worker::WorkerRegistry;

/// Engine-wide configuration bundle.
#[derive(Debug, Clone, Default)]
pub struct EvolutionConfig {
    pub worker: WorkerConfig,
    pub analyzer: AnalyzerConfig,
    pub consensus: ConsensusConfig,
}

/// All engine services assembled over one store, one executor and one
/// notification center. This is the entry point embedders use; each
/// subsystem remains usable on its own.
pub struct EvolutionSystem {
    agents: AgentService,
    workers: Arc<WorkerRegistry>,
    analyzer: EvolutionAnalyzer,
    assignment: Arc<AssignmentPolicy>,
    ledger: CollaborationLedger,
    lifecycle: SuggestionLifecycle,
    notifications: Arc<NotificationCenter>,
    analytics: EvolutionAnalytics,
}

impl EvolutionSystem {
    /// Assemble the engine with default configuration and no advisor.
    pub fn new(store: Arc<dyn Store>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self::with_config(store, executor, None, EvolutionConfig::default())
    }

    /// Assemble the engine with explicit configuration and an optional
    /// advisor for the analyzer's advisory rule.
    pub fn with_config(
        store: Arc<dyn Store>,
        executor: Arc<dyn TaskExecutor>,
        advisor: Option<Arc<dyn Advisor>>,
        config: EvolutionConfig,
    ) -> Self {
        let notifications = Arc::new(NotificationCenter::new(store.clone()));
        let workers = Arc::new(WorkerRegistry::new(
            store.clone(),
            executor,
            config.worker.clone(),
        ));
        let assignment = Arc::new(AssignmentPolicy::new(store.clone(), notifications.clone()));

        let mut analyzer = EvolutionAnalyzer::new(
            store.clone(),
            assignment.clone(),
            notifications.clone(),
            config.analyzer.clone(),
        );
        if let Some(advisor) = advisor {
            analyzer = analyzer.with_advisor(advisor);
        }

        Self {
            agents: AgentService::new(store.clone(), workers.clone()),
            workers,
            analyzer,
            assignment,
            ledger: CollaborationLedger::new(
                store.clone(),
                notifications.clone(),
                config.consensus.clone(),
            ),
            lifecycle: SuggestionLifecycle::new(store.clone(), notifications.clone()),
            notifications: notifications.clone(),
            analytics: EvolutionAnalytics::new(store, config.consensus),
        }
    }

    pub fn agents(&self) -> &AgentService {
        &self.agents
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    pub fn analyzer(&self) -> &EvolutionAnalyzer {
        &self.analyzer
    }

    pub fn assignment(&self) -> &AssignmentPolicy {
        &self.assignment
    }

    pub fn ledger(&self) -> &CollaborationLedger {
        &self.ledger
    }

    pub fn lifecycle(&self) -> &SuggestionLifecycle {
        &self.lifecycle
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn analytics(&self) -> &EvolutionAnalytics {
        &self.analytics
    }

    /// Signal every worker to stop. Call on shutdown.
    pub async fn shutdown(&self) {
        self.workers.shutdown_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::EchoExecutor;
    use crate::store::MemoryStore;
    use crate::types::{SuggestionStatus, TaskStatus};
    use std::time::Duration;
    use tokio::time::sleep;

    fn fast_system() -> (Arc<MemoryStore>, EvolutionSystem) {
        let store = Arc::new(MemoryStore::new());
        let config = EvolutionConfig {
            worker: WorkerConfig {
                poll_interval: Duration::from_millis(10),
            },
            ..EvolutionConfig::default()
        };
        let system =
            EvolutionSystem::with_config(store.clone(), Arc::new(EchoExecutor), None, config);
        (store, system)
    }

    #[tokio::test]
    async fn end_to_end_task_execution() {
        let (_store, system) = fast_system();
        let agent = system.agents().register("scout", None, None).await.unwrap();
        system.agents().start(agent.id).await.unwrap();

        let task = system
            .agents()
            .assign_task(agent.id, "check the weather")
            .await
            .unwrap();

        sleep(Duration::from_millis(100)).await;
        system.shutdown().await;

        let report = system.agents().status(agent.id).await.unwrap();
        let done = report.tasks.iter().find(|t| t.id == task.id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("Executed: check the weather"));
    }

    #[tokio::test]
    async fn suggestions_flow_from_analysis_to_resolution() {
        let (store, system) = fast_system();
        let agent = system.agents().register("flaky", None, None).await.unwrap();

        // Plant three recent failures so the analyzer's reliability rule
        // fires.
        for _ in 0..3 {
            let mut task = store.create_task(agent.id, "doomed".into()).await.unwrap();
            task.status = TaskStatus::Failed;
            task.completed_at = Some(chrono::Utc::now());
            store.update_task(task).await.unwrap();
        }

        let emitted = system.analyzer().analyze().await.unwrap();
        assert_eq!(emitted.len(), 1);
        let suggestion = &emitted[0];
        assert_eq!(suggestion.assigned_agent_id, Some(agent.id));

        // Three collaborators upvote it to positive consensus.
        for voter in 1..=3 {
            system
                .ledger()
                .add(
                    suggestion.id,
                    voter,
                    crate::types::CollaborationAction::Upvote,
                    None,
                )
                .await
                .unwrap();
        }
        assert_eq!(
            system.ledger().consensus(suggestion.id).await.unwrap(),
            crate::types::Consensus::Positive
        );

        // The operator applies it; analytics see the resolution.
        let applied = system.lifecycle().apply(suggestion.id).await.unwrap();
        assert_eq!(applied.status, SuggestionStatus::Applied);

        let outcome = system.analytics().outcome_totals().await.unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(system.lifecycle().history().await.unwrap().len(), 1);
    }
}
