//! Per-issue finite-state loop.
//!
//! One controller drives one issue: ask the router, enforce run budgets,
//! run the chosen pipeline, persist, check termination. Steps within an
//! issue are strictly sequential; concurrency lives one level up in the
//! orchestrator.

use std::sync::Arc;

use lexloop_core::{Action, EventEntry, IssueState, PipelineKind, Result, RunLimits};
use lexloop_store::{CheckpointStore, EventLog};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborator::Reasoner;
use crate::pipeline::PipelineAdapter;
use crate::router::ActionRouter;

/// How one issue's control loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Finalized or no further work needed.
    Solved,
    /// Ran out of pipeline budget (or failure ceiling) without resolving.
    /// Persisted as solved so a resume does not reopen it, but surfaced
    /// separately so the batch log shows it made no real progress.
    Exhausted,
    /// Cooperatively cancelled between steps; state is whatever was last
    /// persisted.
    Cancelled,
}

pub struct IssueController {
    router: ActionRouter,
    research: PipelineAdapter,
    evidence: PipelineAdapter,
    checkpoints: Arc<CheckpointStore>,
    events: Arc<EventLog>,
    limits: RunLimits,
}

impl IssueController {
    pub fn new(
        reasoner: Arc<dyn Reasoner>,
        checkpoints: Arc<CheckpointStore>,
        events: Arc<EventLog>,
        limits: RunLimits,
    ) -> Self {
        Self {
            router: ActionRouter::new(reasoner.clone()),
            research: PipelineAdapter::new(PipelineKind::Research, reasoner.clone()),
            evidence: PipelineAdapter::new(PipelineKind::Evidence, reasoner),
            checkpoints,
            events,
            limits,
        }
    }

    /// Drive the issue to a terminal state. Every successful pipeline step
    /// is checkpointed before the next routing decision; a checkpoint write
    /// failure aborts this issue (never proceed with unpersisted state).
    pub async fn run(
        &self,
        state: &mut IssueState,
        cancel: &CancellationToken,
    ) -> Result<IssueOutcome> {
        if state.solved {
            // Idempotent resume: an already-solved checkpoint short-circuits.
            info!(index = state.index, "issue already solved, skipping");
            return Ok(IssueOutcome::Solved);
        }

        let mut failures = 0usize;

        loop {
            if cancel.is_cancelled() {
                debug!(index = state.index, "issue loop cancelled");
                return Ok(IssueOutcome::Cancelled);
            }

            let research_left = state.runs_for(PipelineKind::Research) < self.limits.max_research_runs;
            let evidence_left = state.runs_for(PipelineKind::Evidence) < self.limits.max_review_runs;

            if !research_left && !evidence_left {
                warn!(
                    index = state.index,
                    research_runs = state.research_runs.len(),
                    evidence_runs = state.evidence_runs.len(),
                    "run budgets exhausted, finalizing"
                );
                state.mark_solved();
                self.checkpoints.save(state).await?;
                return Ok(IssueOutcome::Exhausted);
            }

            let mut action = match self.router.decide(state).await {
                Ok(action) => action,
                Err(e) => {
                    failures += 1;
                    warn!(index = state.index, failures, error = %e, "router call failed");
                    self.events.append(&EventEntry::failure(state, &e)).await?;
                    if failures >= self.limits.max_failures {
                        return self.exhaust_on_failures(state, failures).await;
                    }
                    continue;
                }
            };
            debug!(index = state.index, ?action, "next action");

            // Redirect to the other pipeline when the chosen one has no
            // budget left; finalize when neither does.
            if action == Action::Research && !research_left {
                action = if evidence_left {
                    Action::ReviewEvidence
                } else {
                    Action::Finalize
                };
            }
            if action == Action::ReviewEvidence && !evidence_left {
                action = if research_left {
                    Action::Research
                } else {
                    Action::Finalize
                };
            }

            let adapter = match action {
                Action::Research => &self.research,
                Action::ReviewEvidence => &self.evidence,
                Action::Finalize => {
                    state.mark_solved();
                    self.checkpoints.save(state).await?;
                    info!(index = state.index, "issue finalized");
                    return Ok(IssueOutcome::Solved);
                }
            };

            match adapter.run(state).await {
                Ok(()) => {
                    self.checkpoints.save(state).await?;
                    self.events
                        .append(&EventEntry::pipeline(adapter.kind(), state))
                        .await?;
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        index = state.index,
                        pipeline = %adapter.kind(),
                        failures,
                        error = %e,
                        "pipeline run failed"
                    );
                    self.events.append(&EventEntry::failure(state, &e)).await?;
                    if failures >= self.limits.max_failures {
                        return self.exhaust_on_failures(state, failures).await;
                    }
                    continue;
                }
            }

            if state.can_finalize() {
                state.mark_solved();
                self.checkpoints.save(state).await?;
                info!(index = state.index, "issue solved, no further work needed");
                return Ok(IssueOutcome::Solved);
            }
        }
    }

    /// Failure ceiling hit: stop retrying so the loop is guaranteed to
    /// terminate even when every collaborator call fails.
    async fn exhaust_on_failures(
        &self,
        state: &mut IssueState,
        failures: usize,
    ) -> Result<IssueOutcome> {
        warn!(index = state.index, failures, "failure ceiling reached, finalizing");
        state.mark_solved();
        self.checkpoints.save(state).await?;
        Ok(IssueOutcome::Exhausted)
    }
}
