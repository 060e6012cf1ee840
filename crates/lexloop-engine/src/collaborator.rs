//! Collaborator traits
//!
//! The reasoning and aggregation collaborators are opaque remote services.
//! The engine only knows these narrow interfaces; latency and reliability
//! are outside its control.

use std::path::Path;

use lexloop_core::{Action, IssueState, PipelineKind, PipelineOutcome, Report, Result};

/// The external decision/processing collaborator. Non-deterministic by
/// contract: identical inputs may legitimately yield different actions.
#[async_trait::async_trait]
pub trait Reasoner: Send + Sync {
    /// Pick the next action for an issue given its full current state.
    async fn decide(&self, state: &IssueState) -> Result<Action>;

    /// Run one pipeline over the issue, returning updated recommendation
    /// text and routing hints.
    async fn run_pipeline(&self, kind: PipelineKind, state: &IssueState)
        -> Result<PipelineOutcome>;
}

/// The terminal aggregation collaborator: all final issue states in, one
/// judgement report out.
#[async_trait::async_trait]
pub trait Aggregator: Send + Sync {
    async fn summarize(&self, issues: &[IssueState], context: &CaseContext) -> Result<Report>;
}

/// Case documents handed to the aggregation step alongside the issues.
#[derive(Clone, Debug, Default)]
pub struct CaseContext {
    pub statement_of_claim: String,
    pub statement_of_defence: String,
}

impl CaseContext {
    /// Load both statements from disk. A missing file yields an empty
    /// string; the aggregation collaborator copes with partial context.
    pub async fn load(claim: &Path, defence: &Path) -> Self {
        Self {
            statement_of_claim: read_or_empty(claim).await,
            statement_of_defence: read_or_empty(defence).await,
        }
    }
}

async fn read_or_empty(path: &Path) -> String {
    tokio::fs::read_to_string(path).await.unwrap_or_default()
}
