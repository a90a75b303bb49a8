//! External capability seams.
//!
//! The engine never performs OS or browser automation itself; it hands a
//! task description to a [`TaskExecutor`] and records whatever comes back.
//! Likewise the analyzer's advisory rule goes through the single-method
//! [`Advisor`] trait so a deterministic stub can stand in during tests.

use async_trait::async_trait;

/// Performs the work described by a task.
///
/// Implementations may block for the full duration of the task; the owning
/// worker waits for the call to return before polling again. Errors are
/// captured at task granularity and recorded on the failed task, never
/// propagated to the worker loop.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute one task and return a result summary.
    async fn execute(&self, description: &str) -> anyhow::Result<String>;
}

/// Produces free-form improvement advice from a prompt.
///
/// The analyzer treats this capability as strictly optional: a failing or
/// absent advisor never blocks the rule-based suggestions.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Return advice text for the given prompt.
    async fn advise(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Fallback executor used when no automation backend is wired in: echoes
/// the task description back as the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(&self, description: &str) -> anyhow::Result<String> {
        Ok(format!("Executed: {description}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_executor_reports_the_description() {
        let result = EchoExecutor.execute("open the calendar").await.unwrap();
        assert_eq!(result, "Executed: open the calendar");
    }
}
