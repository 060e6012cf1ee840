//! Tests for lexloop-core: issue state lifecycle, audit records, status types

use lexloop_core::*;

fn sample_issue() -> Issue {
    Issue {
        date_event: "2023-04-12".into(),
        undisputed_facts: "Goods delivered late".into(),
        claimant_position: "Delay caused loss".into(),
        defendant_position: "Delay was excused".into(),
        legal_issue: "Liability for late delivery".into(),
        relevant_documents: vec!["contract.pdf".into()],
    }
}

fn outcome(solved: bool, needs_documents: bool, needs_research: bool) -> PipelineOutcome {
    PipelineOutcome {
        recommendation: "rec".into(),
        suggestion: "sug".into(),
        solved,
        needs_documents,
        needs_research,
        keywords: Vec::new(),
    }
}

// ===========================================================================
// IssueState lifecycle
// ===========================================================================

#[test]
fn fresh_state_routing_defaults() {
    let state = IssueState::fresh(3, sample_issue());
    assert_eq!(state.index, 3);
    assert!(!state.solved);
    assert!(state.needs_research);
    assert!(state.needs_documents); // issue references a document
    assert!(state.seen_keywords.is_empty());
    assert!(state.research_runs.is_empty());
    assert!(state.evidence_runs.is_empty());
}

#[test]
fn fresh_state_without_documents() {
    let issue = Issue {
        relevant_documents: Vec::new(),
        ..sample_issue()
    };
    let state = IssueState::fresh(0, issue);
    assert!(!state.needs_documents);
    assert!(state.needs_research);
}

#[test]
fn mark_solved_clears_routing_hints() {
    let mut state = IssueState::fresh(0, sample_issue());
    assert!(state.needs_research && state.needs_documents);
    state.mark_solved();
    assert!(state.solved);
    assert!(!state.needs_documents);
    assert!(!state.needs_research);
    assert!(state.can_finalize());
}

#[test]
fn apply_outcome_updates_state_and_appends_snapshot() {
    let mut state = IssueState::fresh(0, sample_issue());
    state.apply_outcome(PipelineKind::Research, outcome(false, true, false));

    assert_eq!(state.recommendation, "rec");
    assert_eq!(state.suggestion, "sug");
    assert!(state.needs_documents);
    assert!(!state.needs_research);
    assert_eq!(state.research_runs.len(), 1);
    assert_eq!(state.evidence_runs.len(), 0);
    assert_eq!(state.research_runs[0].pipeline, PipelineKind::Research);
    assert_eq!(state.runs_for(PipelineKind::Research), 1);
}

#[test]
fn apply_outcome_normalizes_solved_invariant() {
    // A pipeline may report solved together with stale routing hints;
    // the persisted state must still satisfy solved => no hints.
    let mut state = IssueState::fresh(0, sample_issue());
    state.apply_outcome(PipelineKind::Evidence, outcome(true, true, true));
    assert!(state.solved);
    assert!(!state.needs_documents);
    assert!(!state.needs_research);
    assert!(!state.evidence_runs[0].needs_documents);
    assert!(!state.evidence_runs[0].needs_research);
}

#[test]
fn seen_keywords_accumulate_monotonically() {
    let mut state = IssueState::fresh(0, sample_issue());
    let mut first = outcome(false, false, true);
    first.keywords = vec!["negligence".into(), "breach".into()];
    state.apply_outcome(PipelineKind::Research, first);

    let mut second = outcome(false, false, false);
    second.keywords = vec!["breach".into(), "damages".into()];
    state.apply_outcome(PipelineKind::Research, second);

    let seen: Vec<&str> = state.seen_keywords.iter().map(String::as_str).collect();
    assert_eq!(seen, vec!["breach", "damages", "negligence"]);
}

#[test]
fn truncate_history_drops_oldest_first() {
    let mut state = IssueState::fresh(0, sample_issue());
    for i in 0..8 {
        let mut o = outcome(false, true, true);
        o.recommendation = format!("run-{i}");
        state.apply_outcome(PipelineKind::Research, o);
    }
    state.truncate_history(5);
    assert_eq!(state.research_runs.len(), 5);
    assert_eq!(state.research_runs[0].recommendation, "run-3");
    assert_eq!(state.research_runs[4].recommendation, "run-7");
}

#[test]
fn truncate_history_noop_under_limit() {
    let mut state = IssueState::fresh(0, sample_issue());
    state.apply_outcome(PipelineKind::Evidence, outcome(false, true, true));
    state.truncate_history(5);
    assert_eq!(state.evidence_runs.len(), 1);
}

// ===========================================================================
// Serde round-trips (checkpoint compatibility)
// ===========================================================================

#[test]
fn issue_state_serde_roundtrip() {
    let mut state = IssueState::fresh(7, sample_issue());
    let mut o = outcome(false, true, false);
    o.keywords = vec!["estoppel".into()];
    state.apply_outcome(PipelineKind::Research, o);

    let json = serde_json::to_string_pretty(&state).unwrap();
    let back: IssueState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.index, 7);
    assert_eq!(back.issue, state.issue);
    assert_eq!(back.research_runs, state.research_runs);
    assert!(back.seen_keywords.contains("estoppel"));
}

#[test]
fn seen_keywords_serialize_ordered() {
    let mut state = IssueState::fresh(0, sample_issue());
    let mut o = outcome(false, false, false);
    o.keywords = vec!["zoning".into(), "arbitration".into(), "mens rea".into()];
    state.apply_outcome(PipelineKind::Research, o);

    let json = serde_json::to_value(&state).unwrap();
    let keywords: Vec<&str> = json["seen_keywords"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(keywords, vec!["arbitration", "mens rea", "zoning"]);
}

#[test]
fn issue_state_tolerates_missing_optional_fields() {
    // A minimal persisted record still loads with defaults.
    let json = r#"{"index": 2, "issue": {"legal_issue": "x"}}"#;
    let state: IssueState = serde_json::from_str(json).unwrap();
    assert_eq!(state.index, 2);
    assert!(!state.solved);
    assert!(state.research_runs.is_empty());
}

#[test]
fn pipeline_kind_and_action_serialize_snake_case() {
    assert_eq!(
        serde_json::to_string(&PipelineKind::Research).unwrap(),
        r#""research""#
    );
    assert_eq!(
        serde_json::to_string(&PipelineKind::Evidence).unwrap(),
        r#""evidence""#
    );
    assert_eq!(
        serde_json::to_string(&Action::ReviewEvidence).unwrap(),
        r#""review_evidence""#
    );
    let action: Action = serde_json::from_str(r#""finalize""#).unwrap();
    assert_eq!(action, Action::Finalize);
}

// ===========================================================================
// EventEntry
// ===========================================================================

#[test]
fn pipeline_event_carries_iteration_count() {
    let mut state = IssueState::fresh(4, sample_issue());
    state.apply_outcome(PipelineKind::Research, outcome(false, true, true));
    state.apply_outcome(PipelineKind::Evidence, outcome(false, true, true));

    let entry = EventEntry::pipeline(PipelineKind::Evidence, &state);
    assert_eq!(entry.kind, EventKind::Evidence);
    assert_eq!(entry.issue_id, Some(4));
    assert_eq!(entry.iteration, Some(2));
    assert_eq!(entry.legal_issue.as_deref(), Some("Liability for late delivery"));
    assert!(entry.error.is_none());
}

#[test]
fn failure_event_captures_error_text() {
    let state = IssueState::fresh(1, sample_issue());
    let entry = EventEntry::failure(&state, "collaborator timed out");
    assert_eq!(entry.kind, EventKind::PipelineFailure);
    assert_eq!(entry.error.as_deref(), Some("collaborator timed out"));
}

#[test]
fn judgement_event_serializes_type_tag() {
    let report = Report {
        judgement: "claim upheld".into(),
    };
    let entry = EventEntry::judgement(&report);
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["type"], "judgement");
    assert_eq!(json["judgement"], "claim upheld");
    // Absent per-issue fields stay off the wire entirely.
    assert!(json.get("issue_id").is_none());
    assert!(json.get("error").is_none());
}

// ===========================================================================
// StatusRecord
// ===========================================================================

#[test]
fn status_record_constructors() {
    let running = StatusRecord::running(4242);
    assert_eq!(running.status, AgentStatus::Running);
    assert_eq!(running.pid, Some(4242));

    let failed = StatusRecord::failed("boom");
    assert_eq!(failed.status, AgentStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("boom"));
    assert!(failed.pid.is_none());
}

#[test]
fn agent_status_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&AgentStatus::Running).unwrap(),
        r#""running""#
    );
    let status: AgentStatus = serde_json::from_str(r#""failed""#).unwrap();
    assert_eq!(status, AgentStatus::Failed);
    assert_eq!(AgentStatus::default(), AgentStatus::Idle);
}
