//! Batch orchestrator: fan-out, barrier, aggregate.
//!
//! Loads the issue corpus, runs one controller task per issue, waits for
//! every task to finish, then hands the full set of final states to the
//! aggregation collaborator.

use std::path::PathBuf;
use std::sync::Arc;

use lexloop_core::{
    Error, EventEntry, Issue, IssueState, LexloopConfig, Report, Result, RunLimits,
};
use lexloop_store::{CheckpointStore, EventLog};
use futures::future;
use serde::Deserialize;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::collaborator::{Aggregator, CaseContext, Reasoner};
use crate::controller::{IssueController, IssueOutcome};

/// Corpus wire format: the issues live under an "events" key.
#[derive(Deserialize)]
struct IssueCorpus {
    events: Vec<Issue>,
}

/// Final states plus the aggregated judgement for one batch.
#[derive(Debug)]
pub struct BatchResult {
    pub issues: Vec<IssueState>,
    pub report: Report,
}

pub struct Orchestrator {
    reasoner: Arc<dyn Reasoner>,
    aggregator: Arc<dyn Aggregator>,
    checkpoints: Arc<CheckpointStore>,
    events: Arc<EventLog>,
    limits: RunLimits,
    issues_path: PathBuf,
    claim_path: PathBuf,
    defence_path: PathBuf,
}

impl Orchestrator {
    pub fn new(
        config: &LexloopConfig,
        reasoner: Arc<dyn Reasoner>,
        aggregator: Arc<dyn Aggregator>,
        checkpoints: Arc<CheckpointStore>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            reasoner,
            aggregator,
            checkpoints,
            events,
            limits: config.limits,
            issues_path: config.paths.issues.clone(),
            claim_path: config.paths.statement_of_claim.clone(),
            defence_path: config.paths.statement_of_defence.clone(),
        }
    }

    /// Run one full batch. Returns `Error::Startup` if the corpus cannot be
    /// loaded (nothing is touched in that case) and `Error::Cancelled` if
    /// the run was stopped cooperatively.
    pub async fn run(&self, cancel: CancellationToken) -> Result<BatchResult> {
        let issues = self.load_issues().await?;
        let run_id = Uuid::new_v4();
        info!(%run_id, count = issues.len(), "starting batch");

        let context = CaseContext::load(&self.claim_path, &self.defence_path).await;

        let mut handles = Vec::with_capacity(issues.len());
        for (index, issue) in issues.into_iter().enumerate() {
            let controller = IssueController::new(
                self.reasoner.clone(),
                self.checkpoints.clone(),
                self.events.clone(),
                self.limits,
            );
            let checkpoints = self.checkpoints.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let mut state = match checkpoints.load(index).await {
                    Some(state) => state,
                    None => IssueState::fresh(index, issue),
                };
                let outcome = controller.run(&mut state, &cancel).await;
                (state, outcome)
            }));
        }

        // Barrier: aggregation only runs after every controller returned.
        let joined = future::join_all(handles).await;
        let mut finals = Vec::with_capacity(joined.len());
        for result in joined {
            let (state, outcome) =
                result.map_err(|e| Error::Internal(format!("issue task panicked: {e}")))?;
            match outcome {
                Ok(IssueOutcome::Solved) => {}
                Ok(IssueOutcome::Exhausted) => {
                    warn!(index = state.index, "issue exhausted without resolution, proceeding");
                }
                Ok(IssueOutcome::Cancelled) => {}
                Err(e) => {
                    // A persistence failure aborts that issue's loop; the
                    // batch still proceeds with its last known state.
                    error!(index = state.index, error = %e, "issue aborted");
                }
            }
            finals.push(state);
        }

        if cancel.is_cancelled() {
            info!(%run_id, "batch cancelled before aggregation");
            return Err(Error::Cancelled);
        }

        info!(%run_id, count = finals.len(), "all issues processed, invoking judgement");
        let report = self.aggregator.summarize(&finals, &context).await?;
        self.events.append(&EventEntry::judgement(&report)).await?;
        info!(%run_id, "batch complete");

        Ok(BatchResult {
            issues: finals,
            report,
        })
    }

    async fn load_issues(&self) -> Result<Vec<Issue>> {
        let data = fs::read_to_string(&self.issues_path).await.map_err(|e| {
            Error::startup(format!(
                "issues corpus {}: {e}",
                self.issues_path.display()
            ))
        })?;
        let corpus: IssueCorpus = serde_json::from_str(&data).map_err(|e| {
            Error::startup(format!(
                "issues corpus {}: {e}",
                self.issues_path.display()
            ))
        })?;
        Ok(corpus.events)
    }
}
