//! Lexloop configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexloopConfig {
    /// Filesystem locations for the corpus, checkpoints, and logs.
    pub paths: PathsConfig,
    /// Run budgets and retry ceilings.
    pub limits: RunLimits,
    /// Control gateway bind settings.
    pub gateway: GatewayConfig,
    /// Remote reasoning/aggregation collaborator.
    pub collaborator: CollaboratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Court-issues corpus (JSON, `{"events": [...]}`).
    pub issues: PathBuf,
    /// Per-issue checkpoint directory.
    pub checkpoint_dir: PathBuf,
    /// Append-only event log (JSONL).
    pub events: PathBuf,
    /// Control-plane status record.
    pub status: PathBuf,
    /// Case context passed to the aggregation step.
    pub statement_of_claim: PathBuf,
    pub statement_of_defence: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = PathBuf::from("dataset");
        Self {
            issues: base.join("court_issues").join("court_issues.json"),
            checkpoint_dir: base.join("orchestrator_state"),
            events: base.join("agent").join("events").join("events.jsonl"),
            status: base.join("agent").join("agent_state.json"),
            statement_of_claim: base.join("documents").join("statement_of_claim.md"),
            statement_of_defence: base.join("documents").join("statement_of_defence.md"),
        }
    }
}

/// Budgets bounding each issue's control loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLimits {
    /// Max research-pipeline runs per issue.
    pub max_research_runs: usize,
    /// Max evidence-review runs per issue.
    pub max_review_runs: usize,
    /// Max run snapshots kept per pipeline in a checkpoint.
    pub max_history: usize,
    /// Max failed collaborator calls per issue before it is exhausted.
    pub max_failures: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_research_runs: 2,
            max_review_runs: 2,
            max_history: 5,
            max_failures: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: BindMode,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 7310,
            bind: BindMode::default(),
        }
    }
}

/// Bind mode for the control gateway.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    #[default]
    Loopback,
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Base URL of the reasoning service.
    pub base_url: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9811".to_string(),
            api_key: None,
        }
    }
}

impl LexloopConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::startup(format!("config {}: {e}", path.display())))?;
        toml::from_str(&data).map_err(|e| Error::startup(format!("config {}: {e}", path.display())))
    }

    /// Load from a TOML file if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
