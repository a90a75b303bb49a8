//! Suggestion lifecycle manager.
//!
//! Suggestions resolve exactly once: pending → applied or pending →
//! rejected. Each resolution appends one audit entry and notifies the
//! operator. Re-resolving a terminal suggestion fails with `InvalidState`
//! rather than silently re-recording history.

use std::sync::Arc;

use tracing::info;

use crate::notify::NotificationCenter;
use crate::store::Store;
use crate::types::{
    EvolutionError, HistoryAction, HistoryEntry, NotificationKind, Result, Suggestion,
    SuggestionId, SuggestionStatus,
};

/// Applies or rejects suggestions and maintains the audit trail.
pub struct SuggestionLifecycle {
    store: Arc<dyn Store>,
    notifier: Arc<NotificationCenter>,
}

impl SuggestionLifecycle {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<NotificationCenter>) -> Self {
        Self { store, notifier }
    }

    /// Mark a pending suggestion as applied.
    pub async fn apply(&self, id: SuggestionId) -> Result<Suggestion> {
        self.resolve(id, HistoryAction::Applied).await
    }

    /// Mark a pending suggestion as rejected.
    pub async fn reject(&self, id: SuggestionId) -> Result<Suggestion> {
        self.resolve(id, HistoryAction::Rejected).await
    }

    /// Full audit trail, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.store.history().await?)
    }

    async fn resolve(&self, id: SuggestionId, action: HistoryAction) -> Result<Suggestion> {
        let mut suggestion = self
            .store
            .suggestion(id)
            .await?
            .ok_or(EvolutionError::SuggestionNotFound(id))?;

        if suggestion.status.is_terminal() {
            return Err(EvolutionError::InvalidState(format!(
                "suggestion {id} was already resolved"
            )));
        }

        let (status, verb) = match action {
            HistoryAction::Applied => (SuggestionStatus::Applied, "applied"),
            HistoryAction::Rejected => (SuggestionStatus::Rejected, "rejected"),
        };
        suggestion.status = status;
        self.store.update_suggestion(suggestion.clone()).await?;
        self.store
            .create_history(id, action, suggestion.description.clone())
            .await?;
        info!(suggestion_id = id, verb, "suggestion resolved");

        self.notifier
            .notify_operator(
                format!("Suggestion '{}' was {verb}.", suggestion.description),
                NotificationKind::Evolution,
                Some(serde_json::json!({ "suggestion_id": id, "action": verb })),
            )
            .await?;

        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::SuggestionKind;

    async fn lifecycle() -> (Arc<MemoryStore>, SuggestionLifecycle) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(NotificationCenter::new(store.clone()));
        let lifecycle = SuggestionLifecycle::new(store.clone(), notifier);
        (store, lifecycle)
    }

    async fn pending(store: &MemoryStore) -> SuggestionId {
        store
            .create_suggestion(Some(1), SuggestionKind::RetryLogic, "add retries".into())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn apply_appends_exactly_one_history_entry() {
        let (store, lifecycle) = lifecycle().await;
        let id = pending(&store).await;

        let applied = lifecycle.apply(id).await.unwrap();
        assert_eq!(applied.status, SuggestionStatus::Applied);

        let history = lifecycle.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].suggestion_id, id);
        assert_eq!(history[0].action, HistoryAction::Applied);
        assert_eq!(history[0].details, "add retries");
    }

    #[tokio::test]
    async fn reject_records_the_rejection() {
        let (store, lifecycle) = lifecycle().await;
        let id = pending(&store).await;

        let rejected = lifecycle.reject(id).await.unwrap();
        assert_eq!(rejected.status, SuggestionStatus::Rejected);

        let history = lifecycle.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Rejected);
    }

    #[tokio::test]
    async fn resolving_unknown_suggestion_is_not_found() {
        let (_store, lifecycle) = lifecycle().await;
        let err = lifecycle.apply(404).await.unwrap_err();
        assert!(matches!(err, EvolutionError::SuggestionNotFound(404)));
    }

    #[tokio::test]
    async fn terminal_suggestion_cannot_be_resolved_again() {
        let (store, lifecycle) = lifecycle().await;
        let id = pending(&store).await;

        lifecycle.apply(id).await.unwrap();

        let err = lifecycle.apply(id).await.unwrap_err();
        assert!(matches!(err, EvolutionError::InvalidState(_)));
        let err = lifecycle.reject(id).await.unwrap_err();
        assert!(matches!(err, EvolutionError::InvalidState(_)));

        // History still holds exactly the one original entry.
        assert_eq!(lifecycle.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolution_notifies_the_operator() {
        let (store, lifecycle) = lifecycle().await;
        let id = pending(&store).await;

        lifecycle.apply(id).await.unwrap();

        let inbox = store.notifications(1, true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.contains("was applied"));
    }
}
