//! Suggestion assignment policy.
//!
//! New suggestions are load-balanced across agents: the agent carrying the
//! fewest assigned suggestions wins, with a stable tie-break on agent id.
//! The count read and the assignment write are not atomic; two suggestions
//! routed near-simultaneously may both land on the agent that looked least
//! loaded at read time. That skew only affects routing, so it is accepted.

use std::sync::Arc;

use tracing::{debug, info};

use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::types::{
    AgentId, EvolutionError, NotificationKind, Result, Suggestion, SuggestionId,
};

/// Routes suggestions to the least-loaded agent.
pub struct AssignmentPolicy {
    store: Arc<dyn Store>,
    notifier: Arc<NotificationCenter>,
}

impl AssignmentPolicy {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<NotificationCenter>) -> Self {
        Self { store, notifier }
    }

    /// Assign a pending suggestion to the least-loaded agent.
    ///
    /// Returns `None` when no agents exist; the suggestion stays unassigned
    /// and the caller decides what to do about it. A suggestion that already
    /// carries an assignee is never re-routed.
    pub async fn assign(&self, suggestion_id: SuggestionId) -> Result<Option<AgentId>> {
        let mut suggestion = self
            .store
            .suggestion(suggestion_id)
            .await?
            .ok_or(EvolutionError::SuggestionNotFound(suggestion_id))?;

        if suggestion.assigned_agent_id.is_some() {
            return Err(EvolutionError::InvalidState(format!(
                "suggestion {suggestion_id} is already assigned"
            )));
        }

        let agents = self.store.agents().await?;
        if agents.is_empty() {
            debug!(suggestion_id, "no agents registered; suggestion left unassigned");
            return Ok(None);
        }

        // Agents come back ordered by id, so the first minimum is the
        // stable tie-break winner.
        let mut best: Option<(usize, AgentId)> = None;
        for agent in &agents {
            let count = self.store.assigned_suggestion_count(agent.id).await?;
            if best.map(|(c, _)| count < c).unwrap_or(true) {
                best = Some((count, agent.id));
            }
        }
        let Some((load, agent_id)) = best else {
            return Ok(None);
        };

        suggestion.assigned_agent_id = Some(agent_id);
        self.store.update_suggestion(suggestion.clone()).await?;
        info!(suggestion_id, agent_id, load, "suggestion assigned");

        self.notifier
            .notify_operator(
                format!(
                    "Suggestion '{}' assigned to agent {agent_id}",
                    suggestion.description
                ),
                NotificationKind::Evolution,
                Some(serde_json::json!({
                    "suggestion_id": suggestion_id,
                    "agent_id": agent_id,
                })),
            )
            .await?;

        Ok(Some(agent_id))
    }

    /// Sweep every unassigned suggestion through the policy.
    ///
    /// Returns the suggestions that received an assignee.
    pub async fn assign_unassigned(&self) -> Result<Vec<Suggestion>> {
        let mut assigned = Vec::new();
        for suggestion in self.store.suggestions().await? {
            if suggestion.assigned_agent_id.is_none() {
                if self.assign(suggestion.id).await?.is_some() {
                    if let Some(updated) = self.store.suggestion(suggestion.id).await? {
                        assigned.push(updated);
                    }
                }
            }
        }
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::SuggestionKind;

    async fn policy() -> (Arc<MemoryStore>, AssignmentPolicy) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(NotificationCenter::new(store.clone()));
        let policy = AssignmentPolicy::new(store.clone(), notifier);
        (store, policy)
    }

    async fn pending_suggestion(store: &MemoryStore) -> Suggestion {
        store
            .create_suggestion(None, SuggestionKind::RetryLogic, "add retries".into())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn assigns_to_least_loaded_agent() {
        let (store, policy) = policy().await;
        let busy = store.create_agent("busy".into(), None, None).await.unwrap();
        let idle = store.create_agent("idle".into(), None, None).await.unwrap();

        // Two suggestions already on the first agent.
        for _ in 0..2 {
            let mut s = pending_suggestion(&store).await;
            s.assigned_agent_id = Some(busy.id);
            store.update_suggestion(s).await.unwrap();
        }

        let fresh = pending_suggestion(&store).await;
        let chosen = policy.assign(fresh.id).await.unwrap();
        assert_eq!(chosen, Some(idle.id));

        let stored = store.suggestion(fresh.id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_agent_id, Some(idle.id));
    }

    #[tokio::test]
    async fn ties_break_toward_lowest_agent_id() {
        let (store, policy) = policy().await;
        let first = store.create_agent("a".into(), None, None).await.unwrap();
        let _second = store.create_agent("b".into(), None, None).await.unwrap();

        let fresh = pending_suggestion(&store).await;
        let chosen = policy.assign(fresh.id).await.unwrap();
        assert_eq!(chosen, Some(first.id));
    }

    #[tokio::test]
    async fn no_agents_leaves_suggestion_unassigned() {
        let (store, policy) = policy().await;
        let fresh = pending_suggestion(&store).await;

        assert_eq!(policy.assign(fresh.id).await.unwrap(), None);
        let stored = store.suggestion(fresh.id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_agent_id, None);
    }

    #[tokio::test]
    async fn reassignment_is_rejected() {
        let (store, policy) = policy().await;
        store.create_agent("a".into(), None, None).await.unwrap();

        let fresh = pending_suggestion(&store).await;
        policy.assign(fresh.id).await.unwrap();

        let err = policy.assign(fresh.id).await.unwrap_err();
        assert!(matches!(err, EvolutionError::InvalidState(_)));
    }

    #[tokio::test]
    async fn unknown_suggestion_is_not_found() {
        let (_store, policy) = policy().await;
        let err = policy.assign(404).await.unwrap_err();
        assert!(matches!(err, EvolutionError::SuggestionNotFound(404)));
    }

    #[tokio::test]
    async fn sweep_assigns_every_unassigned_suggestion() {
        let (store, policy) = policy().await;
        store.create_agent("a".into(), None, None).await.unwrap();
        let s1 = pending_suggestion(&store).await;
        let s2 = pending_suggestion(&store).await;

        let assigned = policy.assign_unassigned().await.unwrap();
        assert_eq!(assigned.len(), 2);
        for id in [s1.id, s2.id] {
            let stored = store.suggestion(id).await.unwrap().unwrap();
            assert!(stored.assigned_agent_id.is_some());
        }
    }
}
