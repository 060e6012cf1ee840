//! Core types for Lexloop
//!
//! The data model for one batch run: immutable `Issue` inputs, the mutable
//! per-issue `IssueState` the controller loop drives, the append-only
//! `RunSnapshot`/`EventEntry` audit records, and the control-plane
//! `StatusRecord`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One court issue as loaded from the corpus. Never mutated after load.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Issue {
    pub date_event: String,
    pub undisputed_facts: String,
    pub claimant_position: String,
    pub defendant_position: String,
    pub legal_issue: String,
    pub relevant_documents: Vec<String>,
}

/// The two alternative pipelines an issue can be routed through.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Case-law research: keyword search over precedents.
    Research,
    /// Evidence review: analysis of the issue's referenced documents.
    Evidence,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Research => "research",
            PipelineKind::Evidence => "evidence",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the router wants to happen next for an issue.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Research,
    ReviewEvidence,
    Finalize,
}

/// Immutable record of one pipeline invocation's outputs.
/// Appended to the matching run list, never edited.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSnapshot {
    pub pipeline: PipelineKind,
    pub recommendation: String,
    pub suggestion: String,
    pub solved: bool,
    pub needs_documents: bool,
    pub needs_research: bool,
}

/// What a pipeline run hands back to the controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub recommendation: String,
    pub suggestion: String,
    pub solved: bool,
    pub needs_documents: bool,
    pub needs_research: bool,
    /// Keywords the research pipeline already searched; folded into
    /// `seen_keywords` so later runs skip them.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Persisted working state for a single issue while the controller hops
/// between the research and evidence pipelines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueState {
    pub index: usize,
    pub issue: Issue,

    /// Shared recommendation/suggestion that travels between pipelines.
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub suggestion: String,

    #[serde(default)]
    pub solved: bool,

    /// Routing hints from the last pipeline run.
    #[serde(default)]
    pub needs_documents: bool,
    #[serde(default)]
    pub needs_research: bool,

    /// Grows monotonically for the life of the issue; ordered on disk.
    #[serde(default)]
    pub seen_keywords: BTreeSet<String>,

    /// Bounded run histories, oldest dropped first on save.
    #[serde(default)]
    pub research_runs: Vec<RunSnapshot>,
    #[serde(default)]
    pub evidence_runs: Vec<RunSnapshot>,
}

impl IssueState {
    /// Initialize a brand-new issue state with routing defaults: every issue
    /// starts wanting research, and wants evidence review only when it
    /// references documents.
    pub fn fresh(index: usize, issue: Issue) -> Self {
        let needs_documents = !issue.relevant_documents.is_empty();
        Self {
            index,
            issue,
            recommendation: String::new(),
            suggestion: String::new(),
            solved: false,
            needs_documents,
            needs_research: true,
            seen_keywords: BTreeSet::new(),
            research_runs: Vec::new(),
            evidence_runs: Vec::new(),
        }
    }

    /// Mark the issue solved. Clears both routing hints so the persisted
    /// invariant `solved => !needs_documents && !needs_research` holds.
    pub fn mark_solved(&mut self) {
        self.solved = true;
        self.needs_documents = false;
        self.needs_research = false;
    }

    /// Both pipelines report no further work is needed.
    pub fn can_finalize(&self) -> bool {
        !self.needs_documents && !self.needs_research
    }

    pub fn runs_for(&self, kind: PipelineKind) -> usize {
        match kind {
            PipelineKind::Research => self.research_runs.len(),
            PipelineKind::Evidence => self.evidence_runs.len(),
        }
    }

    /// Fold one pipeline's outputs into the state and append the audit
    /// snapshot to the matching run list.
    pub fn apply_outcome(&mut self, kind: PipelineKind, outcome: PipelineOutcome) {
        self.recommendation = outcome.recommendation;
        self.suggestion = outcome.suggestion;
        self.solved = outcome.solved;
        self.needs_documents = outcome.needs_documents;
        self.needs_research = outcome.needs_research;
        self.seen_keywords.extend(outcome.keywords);

        if self.solved {
            // Keep the persisted invariant even when a pipeline reports
            // solved together with stale routing hints.
            self.needs_documents = false;
            self.needs_research = false;
        }

        let snapshot = RunSnapshot {
            pipeline: kind,
            recommendation: self.recommendation.clone(),
            suggestion: self.suggestion.clone(),
            solved: self.solved,
            needs_documents: self.needs_documents,
            needs_research: self.needs_research,
        };
        match kind {
            PipelineKind::Research => self.research_runs.push(snapshot),
            PipelineKind::Evidence => self.evidence_runs.push(snapshot),
        }
    }

    /// Drop the oldest snapshots so each run list holds at most
    /// `max_history` entries. Called by the checkpoint store before writing.
    pub fn truncate_history(&mut self, max_history: usize) {
        truncate_oldest(&mut self.research_runs, max_history);
        truncate_oldest(&mut self.evidence_runs, max_history);
    }
}

fn truncate_oldest(runs: &mut Vec<RunSnapshot>, max_history: usize) {
    if runs.len() > max_history {
        runs.drain(..runs.len() - max_history);
    }
}

/// Aggregation collaborator output for the whole batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub judgement: String,
}

/// Kind tag on every audit-log entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Research,
    Evidence,
    PipelineFailure,
    Judgement,
}

/// One line of the append-only audit log. Written whole, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEntry {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventEntry {
    /// Audit entry for one completed pipeline run.
    /// `iteration` counts total runs across both pipelines so far.
    pub fn pipeline(kind: PipelineKind, state: &IssueState) -> Self {
        let event_kind = match kind {
            PipelineKind::Research => EventKind::Research,
            PipelineKind::Evidence => EventKind::Evidence,
        };
        Self {
            kind: event_kind,
            date: Utc::now(),
            issue_id: Some(state.index),
            iteration: Some(state.research_runs.len() + state.evidence_runs.len()),
            legal_issue: Some(state.issue.legal_issue.clone()),
            recommendation: Some(state.recommendation.clone()),
            suggestion: Some(state.suggestion.clone()),
            solved: Some(state.solved),
            judgement: None,
            error: None,
        }
    }

    /// Audit entry for a failed collaborator call.
    pub fn failure(state: &IssueState, error: impl std::fmt::Display) -> Self {
        Self {
            kind: EventKind::PipelineFailure,
            date: Utc::now(),
            issue_id: Some(state.index),
            iteration: Some(state.research_runs.len() + state.evidence_runs.len()),
            legal_issue: Some(state.issue.legal_issue.clone()),
            recommendation: None,
            suggestion: None,
            solved: Some(state.solved),
            judgement: None,
            error: Some(error.to_string()),
        }
    }

    /// Audit entry for the terminal aggregation step.
    pub fn judgement(report: &Report) -> Self {
        Self {
            kind: EventKind::Judgement,
            date: Utc::now(),
            issue_id: None,
            iteration: None,
            legal_issue: None,
            recommendation: None,
            suggestion: None,
            solved: None,
            judgement: Some(report.judgement.clone()),
            error: None,
        }
    }
}

/// Control-plane status for the single orchestrator run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Completed => "completed",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Persisted status record; the cross-process source of truth for the
/// control plane.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    pub status: AgentStatus,
    pub pid: Option<u32>,
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn running(pid: u32) -> Self {
        Self {
            status: AgentStatus::Running,
            pid: Some(pid),
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            status: AgentStatus::Completed,
            pid: None,
            error: None,
        }
    }

    pub fn stopped() -> Self {
        Self {
            status: AgentStatus::Stopped,
            pid: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Failed,
            pid: None,
            error: Some(error.into()),
        }
    }
}
