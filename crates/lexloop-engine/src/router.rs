//! Action router: picks the next step for an issue.
//!
//! Holds no state of its own; the decision is delegated to the reasoning
//! collaborator with the full current issue state. Budgets are enforced by
//! the controller, not here.

use std::sync::Arc;

use lexloop_core::{Action, IssueState, Result};

use crate::collaborator::Reasoner;

pub struct ActionRouter {
    reasoner: Arc<dyn Reasoner>,
}

impl ActionRouter {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    pub async fn decide(&self, state: &IssueState) -> Result<Action> {
        self.reasoner.decide(state).await
    }
}
