//! Autonomous agent task execution and self-improvement.
//!
//! This crate provides the coordination core for a pool of autonomous
//! agents that execute queued work and collectively improve over time:
//!
//! - **Agent Registry & Task Queue**: register agents, control their
//!   lifecycle and feed per-agent FIFO backlogs
//! - **Per-Agent Workers**: one cancellable background task per running
//!   agent, executing its backlog through an injected task executor
//! - **Evolution Analyzer**: mines task history for failure and duration
//!   patterns and emits improvement suggestions
//! - **Assignment Policy**: load-balances suggestions onto the
//!   least-loaded agent
//! - **Collaboration & Consensus**: append-only votes, comments and
//!   threaded discussion with a fixed-threshold consensus signal
//! - **Suggestion Lifecycle**: operator-driven apply/reject with an
//!   append-only audit trail
//! - **Notification Fanout**: persisted notifications with best-effort
//!   push delivery
//!
//! # Architecture
//!
//! State lives behind the [`store::Store`] trait so the persistence
//! technology stays out of the core; [`store::MemoryStore`] is the bundled
//! implementation. The actual work a task describes is delegated to the
//! [`executor::TaskExecutor`] seam, and the analyzer's advisory rule goes
//! through the optional [`executor::Advisor`] seam.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use evomesh::{EchoExecutor, EvolutionSystem, MemoryStore};
//!
//! let system = EvolutionSystem::new(Arc::new(MemoryStore::new()), Arc::new(EchoExecutor));
//!
//! let agent = system.agents().register("scout", None, None).await?;
//! system.agents().start(agent.id).await?;
//! system.agents().assign_task(agent.id, "scan the inbox").await?;
//!
//! let suggestions = system.analyzer().analyze().await?;
//! ```

pub mod agents;
pub mod analytics;
pub mod analyzer;
pub mod assignment;
pub mod collaboration;
pub mod config;
pub mod executor;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod system;
pub mod types;
pub mod worker;

// Re-export main types for convenience
pub use agents::{AgentService, AgentStatusReport};
pub use analytics::{
    AgentActivity, CollaborationTotals, ConsensusBreakdown, EvolutionAnalytics, OutcomeTotals,
};
pub use analyzer::EvolutionAnalyzer;
pub use assignment::AssignmentPolicy;
pub use collaboration::{CollaborationLedger, MessageNode};
pub use config::{AnalyzerConfig, ConsensusConfig, WorkerConfig};
pub use executor::{Advisor, EchoExecutor, TaskExecutor};
pub use lifecycle::SuggestionLifecycle;
pub use notify::{DeliveryEndpoint, NotificationCenter};
pub use store::{MemoryStore, Store, StoreError};
pub use system::{EvolutionConfig, EvolutionSystem};
pub use types::{
    Agent, AgentId, AgentStatus, CollaborationAction, CollaborationEntry, Consensus,
    EvolutionError, HistoryAction, HistoryEntry, Notification, NotificationKind, Result,
    Suggestion, SuggestionKind, SuggestionMessage, SuggestionStatus, Task, TaskStatus, VoteCounts,
};
