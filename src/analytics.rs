//! Read-only aggregate views over the collaboration and resolution data.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaboration::consensus_of;
use crate::config::ConsensusConfig;
use crate::store::Store;
use crate::types::{
    AgentId, CollaborationAction, Consensus, HistoryAction, Result, SuggestionId, VoteCounts,
};

/// Collaboration entry counts per agent and per suggestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollaborationTotals {
    pub per_agent: BTreeMap<AgentId, usize>,
    pub per_suggestion: BTreeMap<SuggestionId, usize>,
}

/// Applied vs rejected resolution counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeTotals {
    pub applied: usize,
    pub rejected: usize,
}

/// How many suggestions sit at each consensus signal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsensusBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub none: usize,
}

/// Per-agent participation counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentActivity {
    /// Discussion messages posted
    pub messages: usize,
    /// Upvotes and downvotes cast
    pub votes: usize,
    /// Suggestions currently assigned
    pub assignments: usize,
}

/// Aggregates engine state for dashboards and reports.
pub struct EvolutionAnalytics {
    store: Arc<dyn Store>,
    consensus: ConsensusConfig,
}

impl EvolutionAnalytics {
    pub fn new(store: Arc<dyn Store>, consensus: ConsensusConfig) -> Self {
        Self { store, consensus }
    }

    /// Ledger entry counts grouped by acting agent and by suggestion.
    pub async fn collaboration_totals(&self) -> Result<CollaborationTotals> {
        let mut totals = CollaborationTotals::default();
        for suggestion in self.store.suggestions().await? {
            for entry in self.store.collaborations(suggestion.id).await? {
                *totals.per_agent.entry(entry.agent_id).or_default() += 1;
                *totals.per_suggestion.entry(suggestion.id).or_default() += 1;
            }
        }
        Ok(totals)
    }

    /// Applied vs rejected counts over the full audit trail.
    pub async fn outcome_totals(&self) -> Result<OutcomeTotals> {
        let mut totals = OutcomeTotals::default();
        for entry in self.store.history().await? {
            match entry.action {
                HistoryAction::Applied => totals.applied += 1,
                HistoryAction::Rejected => totals.rejected += 1,
            }
        }
        Ok(totals)
    }

    /// Consensus signal distribution across all suggestions.
    pub async fn consensus_breakdown(&self) -> Result<ConsensusBreakdown> {
        let mut breakdown = ConsensusBreakdown::default();
        for suggestion in self.store.suggestions().await? {
            let mut counts = VoteCounts::default();
            for entry in self.store.collaborations(suggestion.id).await? {
                match entry.action {
                    CollaborationAction::Upvote => counts.upvotes += 1,
                    CollaborationAction::Downvote => counts.downvotes += 1,
                    _ => {}
                }
            }
            match consensus_of(counts, &self.consensus) {
                Consensus::Positive => breakdown.positive += 1,
                Consensus::Negative => breakdown.negative += 1,
                Consensus::None => breakdown.none += 1,
            }
        }
        Ok(breakdown)
    }

    /// Messages, votes and assignments per agent.
    pub async fn agent_activity(&self) -> Result<BTreeMap<AgentId, AgentActivity>> {
        let mut activity: BTreeMap<AgentId, AgentActivity> = BTreeMap::new();
        for suggestion in self.store.suggestions().await? {
            if let Some(assignee) = suggestion.assigned_agent_id {
                activity.entry(assignee).or_default().assignments += 1;
            }
            for entry in self.store.collaborations(suggestion.id).await? {
                if matches!(
                    entry.action,
                    CollaborationAction::Upvote | CollaborationAction::Downvote
                ) {
                    activity.entry(entry.agent_id).or_default().votes += 1;
                }
            }
            for message in self.store.messages(suggestion.id).await? {
                activity.entry(message.agent_id).or_default().messages += 1;
            }
        }
        Ok(activity)
    }
}
