//! Pipeline adapters.
//!
//! Each adapter shapes the request/response for one pipeline and records
//! the run snapshot. The controller treats the two as interchangeable.

use std::sync::Arc;

use lexloop_core::{IssueState, PipelineKind, Result};

use crate::collaborator::Reasoner;

pub struct PipelineAdapter {
    kind: PipelineKind,
    reasoner: Arc<dyn Reasoner>,
}

impl PipelineAdapter {
    pub fn new(kind: PipelineKind, reasoner: Arc<dyn Reasoner>) -> Self {
        Self { kind, reasoner }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Run one unit of work: invoke the collaborator, fold its outputs into
    /// the state, and append the audit snapshot.
    pub async fn run(&self, state: &mut IssueState) -> Result<()> {
        let outcome = self.reasoner.run_pipeline(self.kind, state).await?;
        state.apply_outcome(self.kind, outcome);
        Ok(())
    }
}
