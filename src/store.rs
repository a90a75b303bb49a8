//! Abstract relational store for engine state.
//!
//! Persistence technology is deliberately out of scope: components talk to a
//! [`Store`] trait object and never to a concrete database. [`MemoryStore`]
//! is the bundled implementation, keeping each entity family in its own
//! table behind a single async lock and handing out monotonically increasing
//! surrogate ids.
//!
//! Every trait method is fallible so that real backends can surface
//! transient errors; workers log those and keep polling.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{
    Agent, AgentId, AgentStatus, CollaborationAction, CollaborationEntry, HistoryAction,
    HistoryEntry, MessageId, Notification, NotificationId, NotificationKind, RecipientId,
    Suggestion, SuggestionId, SuggestionKind, SuggestionMessage, SuggestionStatus, Task, TaskId,
    TaskStatus,
};

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend returned data the engine cannot interpret.
    #[error("store returned inconsistent data: {0}")]
    Inconsistent(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Relational store abstraction over all engine entities.
///
/// Rows are identified by surrogate ids assigned at insert time. Read
/// methods return rows in the order the engine depends on: task backlogs
/// oldest-first, suggestion and notification listings newest-first, ledger
/// entries and messages oldest-first.
///
/// Agent writes are field-scoped: the registry owns `status` and the
/// profile fields, the worker owns `current_task`. No writer can clobber
/// another's field with a stale full-row image.
#[async_trait]
pub trait Store: Send + Sync {
    // --- agents ---

    /// Insert a new idle agent and return the stored row.
    async fn create_agent(
        &self,
        name: String,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> StoreResult<Agent>;

    /// Fetch one agent by id.
    async fn agent(&self, id: AgentId) -> StoreResult<Option<Agent>>;

    /// All agents, ordered by id.
    async fn agents(&self) -> StoreResult<Vec<Agent>>;

    /// Set an agent's lifecycle status and bump its activity timestamp.
    /// Missing rows are ignored.
    async fn set_agent_status(&self, id: AgentId, status: AgentStatus) -> StoreResult<()>;

    /// Set or clear the description of the task an agent is executing and
    /// bump its activity timestamp. Missing rows are ignored.
    async fn set_current_task(
        &self,
        id: AgentId,
        current_task: Option<String>,
    ) -> StoreResult<()>;

    /// Update the cosmetic profile fields. `None` leaves a field untouched;
    /// missing rows are ignored.
    async fn set_agent_profile(
        &self,
        id: AgentId,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> StoreResult<()>;

    /// Bump an agent's activity timestamp. Missing rows are ignored.
    async fn touch_agent(&self, id: AgentId) -> StoreResult<()>;

    /// Delete an agent row; returns whether a row existed.
    async fn delete_agent(&self, id: AgentId) -> StoreResult<bool>;

    // --- tasks ---

    /// Insert a pending task assigned now.
    async fn create_task(&self, agent_id: AgentId, description: String) -> StoreResult<Task>;

    /// Fetch one task by id.
    async fn task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// All tasks owned by an agent, oldest first.
    async fn tasks_for_agent(&self, agent_id: AgentId) -> StoreResult<Vec<Task>>;

    /// The oldest pending or in-progress task for an agent, if any.
    async fn next_claimable_task(&self, agent_id: AgentId) -> StoreResult<Option<Task>>;

    /// Overwrite a task row. Missing rows are ignored.
    async fn update_task(&self, task: Task) -> StoreResult<()>;

    // --- suggestions ---

    /// Insert a pending, unassigned suggestion.
    async fn create_suggestion(
        &self,
        agent_id: Option<AgentId>,
        kind: SuggestionKind,
        description: String,
    ) -> StoreResult<Suggestion>;

    /// Fetch one suggestion by id.
    async fn suggestion(&self, id: SuggestionId) -> StoreResult<Option<Suggestion>>;

    /// All suggestions, newest first.
    async fn suggestions(&self) -> StoreResult<Vec<Suggestion>>;

    /// Overwrite a suggestion row. Missing rows are ignored.
    async fn update_suggestion(&self, suggestion: Suggestion) -> StoreResult<()>;

    /// Number of suggestions currently assigned to an agent.
    async fn assigned_suggestion_count(&self, agent_id: AgentId) -> StoreResult<usize>;

    // --- collaboration ledger ---

    /// Append a collaboration entry.
    async fn create_collaboration(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        action: CollaborationAction,
        comment: Option<String>,
    ) -> StoreResult<CollaborationEntry>;

    /// All ledger entries for a suggestion, oldest first.
    async fn collaborations(&self, suggestion_id: SuggestionId)
        -> StoreResult<Vec<CollaborationEntry>>;

    // --- history ---

    /// Append an audit entry for a suggestion resolution.
    async fn create_history(
        &self,
        suggestion_id: SuggestionId,
        action: HistoryAction,
        details: String,
    ) -> StoreResult<HistoryEntry>;

    /// Full audit trail, newest first.
    async fn history(&self) -> StoreResult<Vec<HistoryEntry>>;

    // --- suggestion messages ---

    /// Append a discussion message.
    async fn create_message(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        content: String,
        parent_id: Option<MessageId>,
    ) -> StoreResult<SuggestionMessage>;

    /// All messages for a suggestion, oldest first.
    async fn messages(&self, suggestion_id: SuggestionId) -> StoreResult<Vec<SuggestionMessage>>;

    // --- notifications ---

    /// Insert an unread notification.
    async fn create_notification(
        &self,
        recipient_id: RecipientId,
        message: String,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> StoreResult<Notification>;

    /// Fetch one notification by id.
    async fn notification(&self, id: NotificationId) -> StoreResult<Option<Notification>>;

    /// Overwrite a notification row. Missing rows are ignored.
    async fn update_notification(&self, notification: Notification) -> StoreResult<()>;

    /// Notifications for a recipient, newest first.
    async fn notifications(
        &self,
        recipient_id: RecipientId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
}

#[derive(Default)]
struct Tables {
    seq: i64,
    agents: BTreeMap<AgentId, Agent>,
    tasks: BTreeMap<TaskId, Task>,
    suggestions: BTreeMap<SuggestionId, Suggestion>,
    collaborations: BTreeMap<i64, CollaborationEntry>,
    history: BTreeMap<i64, HistoryEntry>,
    messages: BTreeMap<MessageId, SuggestionMessage>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }
}

/// In-memory [`Store`] backed by a single async lock.
///
/// Surrogate ids come from one shared sequence, so ids are unique across
/// entity families and strictly increasing in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_agent(
        &self,
        name: String,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> StoreResult<Agent> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();
        let agent = Agent {
            id: tables.next_id(),
            name,
            status: AgentStatus::Idle,
            current_task: None,
            created_at: now,
            last_active: now,
            avatar_url,
            role,
        };
        tables.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn agent(&self, id: AgentId) -> StoreResult<Option<Agent>> {
        Ok(self.inner.read().await.agents.get(&id).cloned())
    }

    async fn agents(&self) -> StoreResult<Vec<Agent>> {
        Ok(self.inner.read().await.agents.values().cloned().collect())
    }

    async fn set_agent_status(&self, id: AgentId, status: AgentStatus) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.agents.get_mut(&id) {
            row.status = status;
            row.last_active = Utc::now();
        }
        Ok(())
    }

    async fn set_current_task(
        &self,
        id: AgentId,
        current_task: Option<String>,
    ) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.agents.get_mut(&id) {
            row.current_task = current_task;
            row.last_active = Utc::now();
        }
        Ok(())
    }

    async fn set_agent_profile(
        &self,
        id: AgentId,
        avatar_url: Option<String>,
        role: Option<String>,
    ) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.agents.get_mut(&id) {
            if let Some(avatar_url) = avatar_url {
                row.avatar_url = Some(avatar_url);
            }
            if let Some(role) = role {
                row.role = Some(role);
            }
        }
        Ok(())
    }

    async fn touch_agent(&self, id: AgentId) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.agents.get_mut(&id) {
            row.last_active = Utc::now();
        }
        Ok(())
    }

    async fn delete_agent(&self, id: AgentId) -> StoreResult<bool> {
        Ok(self.inner.write().await.agents.remove(&id).is_some())
    }

    async fn create_task(&self, agent_id: AgentId, description: String) -> StoreResult<Task> {
        let mut tables = self.inner.write().await;
        let task = Task {
            id: tables.next_id(),
            agent_id,
            description,
            status: TaskStatus::Pending,
            assigned_at: Utc::now(),
            completed_at: None,
            result: None,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn tasks_for_agent(&self, agent_id: AgentId) -> StoreResult<Vec<Task>> {
        let tables = self.inner.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.agent_id == agent_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.assigned_at, t.id));
        Ok(tasks)
    }

    async fn next_claimable_task(&self, agent_id: AgentId) -> StoreResult<Option<Task>> {
        let tables = self.inner.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| {
                t.agent_id == agent_id
                    && matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress)
            })
            .min_by_key(|t| (t.assigned_at, t.id))
            .cloned())
    }

    async fn update_task(&self, task: Task) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.tasks.get_mut(&task.id) {
            *row = task;
        }
        Ok(())
    }

    async fn create_suggestion(
        &self,
        agent_id: Option<AgentId>,
        kind: SuggestionKind,
        description: String,
    ) -> StoreResult<Suggestion> {
        let mut tables = self.inner.write().await;
        let suggestion = Suggestion {
            id: tables.next_id(),
            agent_id,
            assigned_agent_id: None,
            kind,
            description,
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
        };
        tables.suggestions.insert(suggestion.id, suggestion.clone());
        Ok(suggestion)
    }

    async fn suggestion(&self, id: SuggestionId) -> StoreResult<Option<Suggestion>> {
        Ok(self.inner.read().await.suggestions.get(&id).cloned())
    }

    async fn suggestions(&self) -> StoreResult<Vec<Suggestion>> {
        let tables = self.inner.read().await;
        let mut suggestions: Vec<Suggestion> = tables.suggestions.values().cloned().collect();
        suggestions.sort_by_key(|s| std::cmp::Reverse((s.created_at, s.id)));
        Ok(suggestions)
    }

    async fn update_suggestion(&self, suggestion: Suggestion) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.suggestions.get_mut(&suggestion.id) {
            *row = suggestion;
        }
        Ok(())
    }

    async fn assigned_suggestion_count(&self, agent_id: AgentId) -> StoreResult<usize> {
        let tables = self.inner.read().await;
        Ok(tables
            .suggestions
            .values()
            .filter(|s| s.assigned_agent_id == Some(agent_id))
            .count())
    }

    async fn create_collaboration(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        action: CollaborationAction,
        comment: Option<String>,
    ) -> StoreResult<CollaborationEntry> {
        let mut tables = self.inner.write().await;
        let entry = CollaborationEntry {
            id: tables.next_id(),
            suggestion_id,
            agent_id,
            action,
            comment,
            timestamp: Utc::now(),
        };
        tables.collaborations.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn collaborations(
        &self,
        suggestion_id: SuggestionId,
    ) -> StoreResult<Vec<CollaborationEntry>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<CollaborationEntry> = tables
            .collaborations
            .values()
            .filter(|c| c.suggestion_id == suggestion_id)
            .cloned()
            .collect();
        entries.sort_by_key(|c| (c.timestamp, c.id));
        Ok(entries)
    }

    async fn create_history(
        &self,
        suggestion_id: SuggestionId,
        action: HistoryAction,
        details: String,
    ) -> StoreResult<HistoryEntry> {
        let mut tables = self.inner.write().await;
        let entry = HistoryEntry {
            id: tables.next_id(),
            suggestion_id,
            action,
            timestamp: Utc::now(),
            details,
        };
        tables.history.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn history(&self) -> StoreResult<Vec<HistoryEntry>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<HistoryEntry> = tables.history.values().cloned().collect();
        entries.sort_by_key(|h| std::cmp::Reverse((h.timestamp, h.id)));
        Ok(entries)
    }

    async fn create_message(
        &self,
        suggestion_id: SuggestionId,
        agent_id: AgentId,
        content: String,
        parent_id: Option<MessageId>,
    ) -> StoreResult<SuggestionMessage> {
        let mut tables = self.inner.write().await;
        let message = SuggestionMessage {
            id: tables.next_id(),
            suggestion_id,
            agent_id,
            content,
            parent_id,
            timestamp: Utc::now(),
        };
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn messages(&self, suggestion_id: SuggestionId) -> StoreResult<Vec<SuggestionMessage>> {
        let tables = self.inner.read().await;
        let mut messages: Vec<SuggestionMessage> = tables
            .messages
            .values()
            .filter(|m| m.suggestion_id == suggestion_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.timestamp, m.id));
        Ok(messages)
    }

    async fn create_notification(
        &self,
        recipient_id: RecipientId,
        message: String,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> StoreResult<Notification> {
        let mut tables = self.inner.write().await;
        let notification = Notification {
            id: tables.next_id(),
            recipient_id,
            message,
            kind,
            payload,
            is_read: false,
            created_at: Utc::now(),
        };
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn notification(&self, id: NotificationId) -> StoreResult<Option<Notification>> {
        Ok(self.inner.read().await.notifications.get(&id).cloned())
    }

    async fn update_notification(&self, notification: Notification) -> StoreResult<()> {
        let mut tables = self.inner.write().await;
        if let Some(row) = tables.notifications.get_mut(&notification.id) {
            *row = notification;
        }
        Ok(())
    }

    async fn notifications(
        &self,
        recipient_id: RecipientId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.inner.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by_key(|n| std::cmp::Reverse((n.created_at, n.id)));
        Ok(notifications)
    }
}
