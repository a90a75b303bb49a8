//! Evolution analyzer.
//!
//! Scans every agent's task history for systemic patterns and turns them
//! into improvement suggestions:
//!
//! - **Rule 1 (reliability)**: too many failures inside the recent window
//!   suggests adding retry logic.
//! - **Rule 2 (performance)**: a high average completed-task duration
//!   suggests optimizing the workflow.
//! - **Rule 3 (advisory)**: an optional external advisor may contribute a
//!   free-form suggestion; its failure is swallowed.
//!
//! Every emitted suggestion is routed through the assignment policy and
//! produces an operator notification. Repeated analysis under the same
//! conditions emits duplicate suggestions; there is no de-duplication key.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use crate::assignment::AssignmentPolicy;
use crate::config::AnalyzerConfig;
use crate::executor::Advisor;
use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::types::{
    AgentId, NotificationKind, Result, Suggestion, SuggestionKind, Task, TaskStatus,
};

/// Mines task history for systemic problems and emits suggestions.
pub struct EvolutionAnalyzer {
    store: Arc<dyn Store>,
    assignment: Arc<AssignmentPolicy>,
    notifier: Arc<NotificationCenter>,
    advisor: Option<Arc<dyn Advisor>>,
    config: AnalyzerConfig,
}

impl EvolutionAnalyzer {
    pub fn new(
        store: Arc<dyn Store>,
        assignment: Arc<AssignmentPolicy>,
        notifier: Arc<NotificationCenter>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            store,
            assignment,
            notifier,
            advisor: None,
            config,
        }
    }

    /// Attach an external advisor for Rule 3.
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Run one analysis pass over every agent and return the suggestions it
    /// emitted, already routed through assignment.
    pub async fn analyze(&self) -> Result<Vec<Suggestion>> {
        let window_start = Utc::now() - Duration::hours(self.config.failure_window_hours);
        let mut emitted = Vec::new();

        for agent in self.store.agents().await? {
            let tasks = self.store.tasks_for_agent(agent.id).await?;
            if tasks.is_empty() {
                continue;
            }

            let completed: Vec<&Task> = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .collect();
            let failed_count = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Failed)
                .count();
            let recent_failures = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Failed && t.assigned_at > window_start)
                .count();

            if recent_failures > self.config.failure_threshold {
                let description = format!(
                    "Agent {} failed more than {} tasks in the last {}h. Suggest adding retry logic.",
                    agent.name, self.config.failure_threshold, self.config.failure_window_hours
                );
                emitted.push(
                    self.emit(agent.id, SuggestionKind::RetryLogic, description)
                        .await?,
                );
            }

            if let Some(avg_secs) = average_duration_secs(&completed) {
                if avg_secs > self.config.slow_task_secs {
                    let description = format!(
                        "Agent {} has high average task duration ({}s). Suggest optimizing workflow.",
                        agent.name, avg_secs as i64
                    );
                    emitted.push(
                        self.emit(agent.id, SuggestionKind::OptimizeWorkflow, description)
                            .await?,
                    );
                }
            }

            if let Some(advisor) = &self.advisor {
                let prompt = format!(
                    "Agent {} has completed {} tasks, failed {}. Suggest a code or skill improvement.",
                    agent.name,
                    completed.len(),
                    failed_count
                );
                match advisor.advise(&prompt).await {
                    Ok(text) => {
                        let description =
                            format!("AI Suggestion for {}: {}", agent.name, text);
                        emitted.push(
                            self.emit(agent.id, SuggestionKind::Advisory, description)
                                .await?,
                        );
                    }
                    // Advisory failures never block the rule-based suggestions.
                    Err(e) => warn!(agent_id = agent.id, error = %e, "advisory suggestion failed"),
                }
            }
        }

        debug!(count = emitted.len(), "analysis pass complete");
        Ok(emitted)
    }

    async fn emit(
        &self,
        agent_id: AgentId,
        kind: SuggestionKind,
        description: String,
    ) -> Result<Suggestion> {
        let suggestion = self
            .store
            .create_suggestion(Some(agent_id), kind, description.clone())
            .await?;

        if self.assignment.assign(suggestion.id).await?.is_none() {
            debug!(suggestion_id = suggestion.id, "suggestion left unassigned");
        }

        self.notifier
            .notify_operator(
                description,
                NotificationKind::Evolution,
                Some(serde_json::json!({ "suggestion_id": suggestion.id })),
            )
            .await?;

        // Re-read so the caller sees the assignment.
        Ok(self
            .store
            .suggestion(suggestion.id)
            .await?
            .unwrap_or(suggestion))
    }
}

fn average_duration_secs(completed: &[&Task]) -> Option<f64> {
    let durations: Vec<f64> = completed
        .iter()
        .filter_map(|t| {
            t.completed_at
                .map(|done| (done - t.assigned_at).num_milliseconds() as f64 / 1000.0)
        })
        .collect();
    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<f64>() / durations.len() as f64)
}
