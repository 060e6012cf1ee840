//! HTTP-backed collaborator client.
//!
//! Talks JSON to the reasoning service:
//!   POST {base}/route               -> {"next_action": ...}
//!   POST {base}/pipelines/research  -> PipelineOutcome
//!   POST {base}/pipelines/evidence  -> PipelineOutcome
//!   POST {base}/summarize           -> Report

use lexloop_core::{
    Action, CollaboratorConfig, Error, Issue, IssueState, PipelineKind, PipelineOutcome, Report,
    Result,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::collaborator::{Aggregator, CaseContext, Reasoner};

pub struct RemoteCollaborator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteCollaborator {
    pub fn new(config: &CollaboratorConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "collaborator request");

        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::pipeline(path, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::pipeline(path, format!("{status}: {text}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::pipeline(path, format!("invalid response: {e}")))
    }
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    issue_index: usize,
    legal_issue: &'a str,
    solved: bool,
    needs_documents: bool,
    needs_research: bool,
    research_runs: usize,
    evidence_runs: usize,
    seen_keywords: &'a BTreeSet<String>,
    recommendation: &'a str,
    suggestion: &'a str,
}

#[derive(Deserialize)]
struct RouteResponse {
    next_action: Action,
}

#[derive(Serialize)]
struct PipelineRequest<'a> {
    issue_index: usize,
    issue: &'a Issue,
    recommendation: &'a str,
    suggestion: &'a str,
    seen_keywords: &'a BTreeSet<String>,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    issues: &'a [IssueState],
    statement_of_claim: &'a str,
    statement_of_defence: &'a str,
}

#[async_trait::async_trait]
impl Reasoner for RemoteCollaborator {
    async fn decide(&self, state: &IssueState) -> Result<Action> {
        let body = RouteRequest {
            issue_index: state.index,
            legal_issue: &state.issue.legal_issue,
            solved: state.solved,
            needs_documents: state.needs_documents,
            needs_research: state.needs_research,
            research_runs: state.research_runs.len(),
            evidence_runs: state.evidence_runs.len(),
            seen_keywords: &state.seen_keywords,
            recommendation: &state.recommendation,
            suggestion: &state.suggestion,
        };
        let response: RouteResponse = self.post_json("route", &body).await?;
        Ok(response.next_action)
    }

    async fn run_pipeline(
        &self,
        kind: PipelineKind,
        state: &IssueState,
    ) -> Result<PipelineOutcome> {
        let body = PipelineRequest {
            issue_index: state.index,
            issue: &state.issue,
            recommendation: &state.recommendation,
            suggestion: &state.suggestion,
            seen_keywords: &state.seen_keywords,
        };
        let path = format!("pipelines/{}", kind.as_str());
        self.post_json(&path, &body).await
    }
}

#[async_trait::async_trait]
impl Aggregator for RemoteCollaborator {
    async fn summarize(&self, issues: &[IssueState], context: &CaseContext) -> Result<Report> {
        let body = SummarizeRequest {
            issues,
            statement_of_claim: &context.statement_of_claim,
            statement_of_defence: &context.statement_of_defence,
        };
        self.post_json("summarize", &body).await
    }
}
