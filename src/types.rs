//! Common entity types shared across the engine.
//!
//! All entities are keyed by surrogate ids handed out by the backing store,
//! mirroring a relational schema. Terminal states are immutable: once a task
//! or suggestion reaches one, no component writes to it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Unique identifier for an agent.
pub type AgentId = i64;

/// Unique identifier for a task.
pub type TaskId = i64;

/// Unique identifier for a suggestion.
pub type SuggestionId = i64;

/// Unique identifier for a collaboration entry.
pub type CollaborationId = i64;

/// Unique identifier for a history entry.
pub type HistoryId = i64;

/// Unique identifier for a suggestion message.
pub type MessageId = i64;

/// Unique identifier for a notification.
pub type NotificationId = i64;

/// Identifier of a notification recipient (an agent or the operator).
pub type RecipientId = i64;

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered but not picking up work
    Idle,
    /// Actively polling its backlog
    Running,
    /// Explicitly stopped by the operator
    Stopped,
}

/// An autonomous worker identity that owns a backlog of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier
    pub id: AgentId,

    /// Human-readable name
    pub name: String,

    /// Current lifecycle status
    pub status: AgentStatus,

    /// Description of the task currently being executed, if any
    pub current_task: Option<String>,

    /// When the agent was registered
    pub created_at: DateTime<Utc>,

    /// Last time the agent's worker touched its row
    pub last_active: DateTime<Utc>,

    /// Optional avatar for UI surfaces
    pub avatar_url: Option<String>,

    /// Optional role label (e.g. "researcher")
    pub role: Option<String>,
}

/// Execution status of a task. Transitions only move forward:
/// pending → in_progress → {completed, failed}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A unit of work assigned to exactly one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// The agent that owns this task
    pub agent_id: AgentId,

    /// What the task executor should do
    pub description: String,

    /// Current execution status
    pub status: TaskStatus,

    /// When the task was assigned to the agent
    pub assigned_at: DateTime<Utc>,

    /// When the task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Executor output on success, or an error summary on failure
    pub result: Option<String>,
}

/// Category of an improvement suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Reliability: the agent should retry failed work
    RetryLogic,
    /// Performance: the agent's workflow is slow
    OptimizeWorkflow,
    /// Free-form advice from the external advisory engine
    Advisory,
    /// Custom suggestion kind
    Custom(String),
}

/// Resolution status of a suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Applied,
    Rejected,
}

impl SuggestionStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SuggestionStatus::Applied | SuggestionStatus::Rejected)
    }
}

/// A proposed improvement emitted by the evolution analyzer, owned by one
/// assigned agent and resolved to applied or rejected by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Unique suggestion identifier
    pub id: SuggestionId,

    /// The agent whose history triggered this suggestion, if any
    pub agent_id: Option<AgentId>,

    /// The agent responsible for this suggestion. Set once by the
    /// assignment policy and immutable thereafter.
    pub assigned_agent_id: Option<AgentId>,

    /// Category of the suggestion
    pub kind: SuggestionKind,

    /// Human-readable description
    pub description: String,

    /// Current resolution status
    pub status: SuggestionStatus,

    /// When the suggestion was emitted
    pub created_at: DateTime<Utc>,
}

/// Action recorded in the collaboration ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationAction {
    Upvote,
    Downvote,
    Comment,
    Endorse,
    /// Custom action label
    Custom(String),
}

impl CollaborationAction {
    /// Stable label used in notification messages.
    pub fn as_str(&self) -> &str {
        match self {
            CollaborationAction::Upvote => "upvote",
            CollaborationAction::Downvote => "downvote",
            CollaborationAction::Comment => "comment",
            CollaborationAction::Endorse => "endorse",
            CollaborationAction::Custom(label) => label.as_str(),
        }
    }
}

/// Append-only record of a vote, comment or other action on a suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationEntry {
    /// Unique entry identifier
    pub id: CollaborationId,

    /// The suggestion this entry refers to
    pub suggestion_id: SuggestionId,

    /// The agent that performed the action
    pub agent_id: AgentId,

    /// The recorded action
    pub action: CollaborationAction,

    /// Optional free-form comment
    pub comment: Option<String>,

    /// When the action was recorded
    pub timestamp: DateTime<Utc>,
}

/// Terminal action recorded in the suggestion audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Applied,
    Rejected,
}

/// Append-only audit record of a suggestion resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier
    pub id: HistoryId,

    /// The suggestion that was resolved
    pub suggestion_id: SuggestionId,

    /// Whether the suggestion was applied or rejected
    pub action: HistoryAction,

    /// When the resolution happened
    pub timestamp: DateTime<Utc>,

    /// Description of the suggestion at resolution time
    pub details: String,
}

/// A threaded discussion message attached to a suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionMessage {
    /// Unique message identifier
    pub id: MessageId,

    /// The suggestion under discussion
    pub suggestion_id: SuggestionId,

    /// The agent that posted the message
    pub agent_id: AgentId,

    /// Message body
    pub content: String,

    /// Parent message for replies; `None` for top-level messages
    pub parent_id: Option<MessageId>,

    /// When the message was posted
    pub timestamp: DateTime<Utc>,
}

/// Category of a persisted notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    General,
    Task,
    Evolution,
}

/// A persisted, best-effort-delivered record of a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier
    pub id: NotificationId,

    /// Who the notification is for
    pub recipient_id: RecipientId,

    /// Human-readable message
    pub message: String,

    /// Notification category
    pub kind: NotificationKind,

    /// Structured payload for machine consumers
    pub payload: serde_json::Value,

    /// Whether the recipient has acknowledged the notification
    pub is_read: bool,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// All-time tally of upvotes and downvotes on a suggestion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCounts {
    pub upvotes: usize,
    pub downvotes: usize,
}

/// Heuristic signal derived from accumulated votes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Consensus {
    /// Enough upvotes and a clear lead over downvotes
    Positive,
    /// Enough downvotes and a clear lead over upvotes
    Negative,
    /// Not enough votes either way
    None,
}

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("suggestion not found: {0}")]
    SuggestionNotFound(SuggestionId),

    #[error("notification not found: {0}")]
    NotificationNotFound(NotificationId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EvolutionError>;
