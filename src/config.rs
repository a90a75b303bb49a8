//! Configuration for the worker scheduler, analyzer and consensus calculator.
//!
//! Every threshold the engine uses is a named constant with a documented
//! default; components take the corresponding config struct so tests can
//! tighten or loosen the thresholds without touching engine code.

use std::time::Duration;

use crate::types::RecipientId;

/// Default worker poll interval (1 second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default analyzer failure window in hours (24 hours).
pub const DEFAULT_FAILURE_WINDOW_HOURS: i64 = 24;

/// Default failure threshold: strictly more than this many failures inside
/// the window triggers a retry-logic suggestion (default: 2).
pub const DEFAULT_FAILURE_THRESHOLD: usize = 2;

/// Default slow-task threshold in seconds: a higher average completed-task
/// duration triggers an optimize-workflow suggestion (default: 30).
pub const DEFAULT_SLOW_TASK_SECS: f64 = 30.0;

/// Default minimum upvotes for a positive consensus (default: 3).
pub const DEFAULT_POSITIVE_THRESHOLD: usize = 3;

/// Default minimum downvotes for a negative consensus (default: 3).
pub const DEFAULT_NEGATIVE_THRESHOLD: usize = 3;

/// Default recipient id for operator-facing notifications (default: 1).
pub const DEFAULT_OPERATOR_RECIPIENT: RecipientId = 1;

/// Configuration for per-agent workers.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often a worker polls its agent's backlog
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Configuration for the evolution analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// How far back the failure count looks
    pub failure_window_hours: i64,

    /// Failures inside the window must exceed this to trigger Rule 1
    pub failure_threshold: usize,

    /// Average completed-task duration in seconds above which Rule 2 fires
    pub slow_task_secs: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            failure_window_hours: DEFAULT_FAILURE_WINDOW_HOURS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            slow_task_secs: DEFAULT_SLOW_TASK_SECS,
        }
    }
}

/// Configuration for the consensus calculator.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Minimum upvotes for a positive signal
    pub positive_threshold: usize,

    /// Minimum downvotes for a negative signal
    pub negative_threshold: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            positive_threshold: DEFAULT_POSITIVE_THRESHOLD,
            negative_threshold: DEFAULT_NEGATIVE_THRESHOLD,
        }
    }
}
