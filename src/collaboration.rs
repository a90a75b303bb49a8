//! Collaboration ledger and consensus calculator.
//!
//! Agents react to suggestions by appending votes, comments and other
//! actions to an append-only ledger. Because entries are never mutated and
//! tallies are commutative, concurrent collaborators need no coordination.
//! Consensus is a fixed-threshold heuristic over the all-time vote tally,
//! not a fault-tolerant protocol.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConsensusConfig;
use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::types::{
    AgentId, CollaborationAction, CollaborationEntry, Consensus, EvolutionError, MessageId,
    NotificationKind, Result, SuggestionId, SuggestionMessage, VoteCounts,
};

/// Derive the consensus signal from a vote tally.
///
/// Positive requires reaching the upvote threshold with a strict lead over
/// downvotes; negative is symmetric. Anything else, including an exact tie
/// at the thresholds, is no consensus.
pub fn consensus_of(counts: VoteCounts, config: &ConsensusConfig) -> Consensus {
    if counts.upvotes >= config.positive_threshold && counts.upvotes > counts.downvotes {
        Consensus::Positive
    } else if counts.downvotes >= config.negative_threshold
        && counts.downvotes > counts.upvotes
    {
        Consensus::Negative
    } else {
        Consensus::None
    }
}

/// A suggestion message with its replies nested recursively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageNode {
    pub message: SuggestionMessage,
    pub replies: Vec<MessageNode>,
}

/// Append-only record of votes, comments and actions per suggestion.
pub struct CollaborationLedger {
    store: Arc<dyn Store>,
    notifier: Arc<NotificationCenter>,
    config: ConsensusConfig,
}

impl CollaborationLedger {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<NotificationCenter>,
        config: ConsensusConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Append a collaboration entry and notify the suggestion's assigned
    /// agent, if it has one.
    pub async fn add(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        action: CollaborationAction,
        comment: Option<String>,
    ) -> Result<CollaborationEntry> {
        let suggestion = self
            .store
            .suggestion(suggestion_id)
            .await?
            .ok_or(EvolutionError::SuggestionNotFound(suggestion_id))?;

        let entry = self
            .store
            .create_collaboration(suggestion_id, agent_id, action, comment)
            .await?;
        debug!(suggestion_id, agent_id, "collaboration recorded");

        if let Some(assignee) = suggestion.assigned_agent_id {
            self.notifier
                .create(
                    assignee,
                    format!(
                        "Agent {agent_id} performed '{}' on suggestion '{}'",
                        entry.action.as_str(),
                        suggestion.description
                    ),
                    NotificationKind::Evolution,
                    Some(serde_json::json!({
                        "suggestion_id": suggestion_id,
                        "collaboration_id": entry.id,
                    })),
                )
                .await?;
        }

        Ok(entry)
    }

    /// All ledger entries for a suggestion, oldest first.
    pub async fn entries(&self, suggestion_id: SuggestionId) -> Result<Vec<CollaborationEntry>> {
        Ok(self.store.collaborations(suggestion_id).await?)
    }

    /// All-time upvote/downvote tally for a suggestion.
    pub async fn vote_counts(&self, suggestion_id: SuggestionId) -> Result<VoteCounts> {
        let entries = self.store.collaborations(suggestion_id).await?;
        let mut counts = VoteCounts::default();
        for entry in &entries {
            match entry.action {
                CollaborationAction::Upvote => counts.upvotes += 1,
                CollaborationAction::Downvote => counts.downvotes += 1,
                _ => {}
            }
        }
        Ok(counts)
    }

    /// Consensus signal for a suggestion under the configured thresholds.
    pub async fn consensus(&self, suggestion_id: SuggestionId) -> Result<Consensus> {
        let counts = self.vote_counts(suggestion_id).await?;
        Ok(consensus_of(counts, &self.config))
    }

    /// Post a threaded discussion message on a suggestion.
    pub async fn post_message(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        content: String,
        parent_id: Option<MessageId>,
    ) -> Result<SuggestionMessage> {
        self.store
            .suggestion(suggestion_id)
            .await?
            .ok_or(EvolutionError::SuggestionNotFound(suggestion_id))?;

        Ok(self
            .store
            .create_message(suggestion_id, agent_id, content, parent_id)
            .await?)
    }

    /// Top-level messages ordered by timestamp ascending, with replies
    /// nested recursively under their parents.
    pub async fn message_tree(&self, suggestion_id: SuggestionId) -> Result<Vec<MessageNode>> {
        let messages = self.store.messages(suggestion_id).await?;

        let mut children: HashMap<Option<MessageId>, Vec<SuggestionMessage>> = HashMap::new();
        for message in messages {
            children.entry(message.parent_id).or_default().push(message);
        }

        fn build(
            parent: Option<MessageId>,
            children: &HashMap<Option<MessageId>, Vec<SuggestionMessage>>,
        ) -> Vec<MessageNode> {
            children
                .get(&parent)
                .into_iter()
                .flatten()
                .map(|message| MessageNode {
                    message: message.clone(),
                    replies: build(Some(message.id), children),
                })
                .collect()
        }

        Ok(build(None, &children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::SuggestionKind;

    async fn ledger() -> (Arc<MemoryStore>, CollaborationLedger) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(NotificationCenter::new(store.clone()));
        let ledger = CollaborationLedger::new(store.clone(), notifier, ConsensusConfig::default());
        (store, ledger)
    }

    async fn suggestion(store: &MemoryStore) -> SuggestionId {
        store
            .create_suggestion(None, SuggestionKind::OptimizeWorkflow, "speed it up".into())
            .await
            .unwrap()
            .id
    }

    async fn vote(ledger: &CollaborationLedger, id: SuggestionId, voter: AgentId, up: bool) {
        let action = if up {
            CollaborationAction::Upvote
        } else {
            CollaborationAction::Downvote
        };
        ledger.add(id, voter, action, None).await.unwrap();
    }

    #[tokio::test]
    async fn vote_counts_tally_upvotes_and_downvotes() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        vote(&ledger, id, 1, true).await;
        vote(&ledger, id, 2, true).await;
        vote(&ledger, id, 3, false).await;
        ledger
            .add(id, 4, CollaborationAction::Comment, Some("hm".into()))
            .await
            .unwrap();

        let counts = ledger.vote_counts(id).await.unwrap();
        assert_eq!(counts, VoteCounts { upvotes: 2, downvotes: 1 });
    }

    #[tokio::test]
    async fn consensus_boundary_tie_is_none() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        for voter in 1..=3 {
            vote(&ledger, id, voter, true).await;
            vote(&ledger, id, voter + 10, false).await;
        }

        // 3 upvotes vs 3 downvotes: thresholds met but no strict lead.
        assert_eq!(ledger.consensus(id).await.unwrap(), Consensus::None);
    }

    #[tokio::test]
    async fn three_upvotes_one_downvote_is_positive() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        for voter in 1..=3 {
            vote(&ledger, id, voter, true).await;
        }
        vote(&ledger, id, 9, false).await;

        assert_eq!(ledger.consensus(id).await.unwrap(), Consensus::Positive);
    }

    #[tokio::test]
    async fn consensus_flips_when_threshold_is_crossed() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        vote(&ledger, id, 1, true).await;
        vote(&ledger, id, 2, true).await;
        vote(&ledger, id, 3, false).await;
        assert_eq!(ledger.consensus(id).await.unwrap(), Consensus::None);

        vote(&ledger, id, 4, true).await;
        assert_eq!(ledger.consensus(id).await.unwrap(), Consensus::Positive);
    }

    #[tokio::test]
    async fn downvote_majority_is_negative() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        vote(&ledger, id, 1, true).await;
        for voter in 2..=4 {
            vote(&ledger, id, voter, false).await;
        }

        assert_eq!(ledger.consensus(id).await.unwrap(), Consensus::Negative);
    }

    #[tokio::test]
    async fn collaboration_on_missing_suggestion_is_not_found() {
        let (_store, ledger) = ledger().await;
        let err = ledger
            .add(404, 1, CollaborationAction::Upvote, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EvolutionError::SuggestionNotFound(404)));
    }

    #[tokio::test]
    async fn collaboration_notifies_the_assigned_agent() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;
        let assignee = store.create_agent("owner".into(), None, None).await.unwrap();

        let mut s = store.suggestion(id).await.unwrap().unwrap();
        s.assigned_agent_id = Some(assignee.id);
        store.update_suggestion(s).await.unwrap();

        ledger
            .add(id, 42, CollaborationAction::Endorse, None)
            .await
            .unwrap();

        let inbox = store.notifications(assignee.id, true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("endorse"));
    }

    #[tokio::test]
    async fn message_tree_nests_replies_recursively() {
        let (store, ledger) = ledger().await;
        let id = suggestion(&store).await;

        let top1 = ledger.post_message(id, 1, "first".into(), None).await.unwrap();
        let top2 = ledger.post_message(id, 2, "second".into(), None).await.unwrap();
        let reply = ledger
            .post_message(id, 3, "reply".into(), Some(top1.id))
            .await
            .unwrap();
        let nested = ledger
            .post_message(id, 4, "nested".into(), Some(reply.id))
            .await
            .unwrap();

        let tree = ledger.message_tree(id).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].message.id, top1.id);
        assert_eq!(tree[1].message.id, top2.id);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].message.id, reply.id);
        assert_eq!(tree[0].replies[0].replies[0].message.id, nested.id);
        assert!(tree[1].replies.is_empty());
    }

    #[tokio::test]
    async fn message_on_missing_suggestion_is_not_found() {
        let (_store, ledger) = ledger().await;
        let err = ledger
            .post_message(404, 1, "hello".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EvolutionError::SuggestionNotFound(404)));
    }
}
