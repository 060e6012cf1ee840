//! Per-issue checkpoint persistence.
//!
//! One JSON file per issue index, written atomically (temp file + rename) so
//! a crash mid-write never leaves a half-written record behind. Concurrent
//! issue loops each write only their own index, so writes never collide.

use std::path::{Path, PathBuf};

use lexloop_core::{Error, IssueState, Result};
use tokio::fs;
use tracing::warn;

pub struct CheckpointStore {
    dir: PathBuf,
    max_history: usize,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            dir: dir.into(),
            max_history,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("issue_{index}.json"))
    }

    /// Persist an issue state snapshot. Run histories are truncated to
    /// `max_history` (oldest first) before writing. A write failure is an
    /// error: the caller must not proceed as if the state were saved.
    pub async fn save(&self, state: &IssueState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::persistence(format!("mkdir {}: {e}", self.dir.display())))?;

        let mut snapshot = state.clone();
        snapshot.truncate_history(self.max_history);
        let json = serde_json::to_string_pretty(&snapshot)?;

        let path = self.path_for(state.index);
        let tmp = self.dir.join(format!("issue_{}.json.tmp", state.index));
        fs::write(&tmp, json)
            .await
            .map_err(|e| Error::persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::persistence(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }

    /// Load a prior checkpoint if one exists. An absent or corrupt record is
    /// treated as "no checkpoint": the issue starts fresh.
    pub async fn load(&self, index: usize) -> Option<IssueState> {
        let path = self.path_for(index);
        let data = fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&data) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(index, error = %e, "corrupt checkpoint, starting fresh");
                None
            }
        }
    }

    /// Wipe all checkpoints for a fresh run.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::persistence(format!(
                    "clear {}: {e}",
                    self.dir.display()
                )))
            }
        }
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::persistence(format!("mkdir {}: {e}", self.dir.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexloop_core::{Issue, PipelineKind, PipelineOutcome};

    fn state_with_runs(index: usize, runs: usize) -> IssueState {
        let mut state = IssueState::fresh(
            index,
            Issue {
                legal_issue: "test issue".into(),
                ..Issue::default()
            },
        );
        for i in 0..runs {
            state.apply_outcome(
                PipelineKind::Research,
                PipelineOutcome {
                    recommendation: format!("run-{i}"),
                    needs_research: true,
                    ..PipelineOutcome::default()
                },
            );
        }
        state
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), 5);

        let state = state_with_runs(3, 2);
        store.save(&state).await.unwrap();

        let loaded = store.load(3).await.unwrap();
        assert_eq!(loaded.index, 3);
        assert_eq!(loaded.research_runs.len(), 2);
        assert_eq!(loaded.issue.legal_issue, "test issue");
    }

    #[tokio::test]
    async fn load_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), 5);
        assert!(store.load(0).await.is_none());
    }

    #[tokio::test]
    async fn load_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), 5);
        tokio::fs::write(dir.path().join("issue_1.json"), "{not json")
            .await
            .unwrap();
        assert!(store.load(1).await.is_none());
    }

    #[tokio::test]
    async fn save_truncates_history_to_max() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), 5);

        let state = state_with_runs(0, 9);
        store.save(&state).await.unwrap();

        let loaded = store.load(0).await.unwrap();
        assert_eq!(loaded.research_runs.len(), 5);
        // Oldest entries dropped first.
        assert_eq!(loaded.research_runs[0].recommendation, "run-4");
        assert_eq!(loaded.research_runs[4].recommendation, "run-8");
    }

    #[tokio::test]
    async fn save_overwrites_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), 5);

        let mut state = state_with_runs(2, 1);
        store.save(&state).await.unwrap();
        state.mark_solved();
        store.save(&state).await.unwrap();

        let loaded = store.load(2).await.unwrap();
        assert!(loaded.solved);
        assert!(!loaded.needs_research);
        // No temp file left behind.
        assert!(!dir.path().join("issue_2.json.tmp").exists());
    }

    #[tokio::test]
    async fn clear_removes_all_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state"), 5);

        store.save(&state_with_runs(0, 1)).await.unwrap();
        store.save(&state_with_runs(1, 1)).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load(0).await.is_none());
        assert!(store.load(1).await.is_none());
        // Clear on an already-empty store is fine.
        store.clear().await.unwrap();
    }
}
