//! Control plane for a single long-running orchestrator invocation.
//!
//! The persisted `StatusRecord` is the cross-process source of truth;
//! pid liveness is re-checked on every read so a crashed run is reported
//! as failed, never left silently "running". Platform specifics live
//! behind `ProcessControl` so the reconciliation logic stays portable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lexloop_core::{AgentStatus, Error, Result, StatusRecord};
use lexloop_engine::Orchestrator;
use lexloop_store::{CheckpointStore, EventLog};
use tokio::fs;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pid liveness and termination, abstracted for tests.
#[async_trait::async_trait]
pub trait ProcessControl: Send + Sync {
    async fn is_alive(&self, pid: u32) -> bool;
    async fn terminate(&self, pid: u32) -> Result<()>;
}

/// Unix implementation shelling out to kill(1).
pub struct UnixProcessControl;

async fn run_kill(args: &[&str]) -> Result<()> {
    let output = Command::new("kill")
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Internal(format!("kill exec failed: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(Error::Internal(format!("kill error: {stderr}")))
    }
}

#[async_trait::async_trait]
impl ProcessControl for UnixProcessControl {
    async fn is_alive(&self, pid: u32) -> bool {
        run_kill(&["-0", &pid.to_string()]).await.is_ok()
    }

    async fn terminate(&self, pid: u32) -> Result<()> {
        run_kill(&["-TERM", &pid.to_string()]).await
    }
}

/// Persisted status record, one JSON file.
#[derive(Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; a missing or unreadable file means idle.
    pub async fn read(&self) -> StatusRecord {
        match fs::read_to_string(&self.path).await {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => StatusRecord::default(),
        }
    }

    pub async fn write(&self, record: &StatusRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persistence(format!("mkdir {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| Error::persistence(format!("write {}: {e}", self.path.display())))
    }
}

struct RunningTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ControlPlane {
    orchestrator: Arc<Orchestrator>,
    status: StatusStore,
    process: Arc<dyn ProcessControl>,
    checkpoints: Arc<CheckpointStore>,
    events: Arc<EventLog>,
    running: Mutex<Option<RunningTask>>,
}

impl ControlPlane {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        status: StatusStore,
        process: Arc<dyn ProcessControl>,
        checkpoints: Arc<CheckpointStore>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            orchestrator,
            status,
            process,
            checkpoints,
            events,
            running: Mutex::new(None),
        }
    }

    /// Start a fresh orchestrator run in the background. Conflicts (409) if
    /// a run is recorded and its pid is still alive; a dead pid is
    /// reconciled to idle first.
    pub async fn start(&self) -> Result<StatusRecord> {
        let record = self.status.read().await;
        if record.status == AgentStatus::Running {
            if let Some(pid) = record.pid {
                if self.process.is_alive(pid).await {
                    return Err(Error::conflict(409, "agent is already running"));
                }
            }
            warn!("recorded run is dead, reconciling before start");
            self.status.write(&StatusRecord::default()).await?;
        }

        // Fresh run: wipe the audit log and all checkpoints.
        self.events.clear().await?;
        self.checkpoints.clear().await?;

        let pid = std::process::id();
        let record = StatusRecord::running(pid);
        self.status.write(&record).await?;
        info!(pid, "agent starting");

        let cancel = CancellationToken::new();
        let orchestrator = self.orchestrator.clone();
        let status = self.status.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let final_record = match orchestrator.run(task_cancel).await {
                Ok(result) => {
                    info!(issues = result.issues.len(), "agent run completed");
                    StatusRecord::completed()
                }
                Err(Error::Cancelled) => StatusRecord::stopped(),
                Err(e) => {
                    error!(error = %e, "agent run failed");
                    StatusRecord::failed(e.to_string())
                }
            };
            if let Err(e) = status.write(&final_record).await {
                error!(error = %e, "failed to persist final agent status");
            }
        });
        *self.running.lock().await = Some(RunningTask { cancel, handle });

        Ok(record)
    }

    /// Stop the recorded run: cooperative cancellation when it lives in
    /// this process, termination signal otherwise. Conflicts (400) when
    /// nothing is running.
    pub async fn stop(&self) -> Result<StatusRecord> {
        let record = self.status.read().await;
        if record.status != AgentStatus::Running {
            return Err(Error::conflict(
                400,
                format!("no agent is currently running (status: {})", record.status),
            ));
        }

        let mut stopped = false;
        if let Some(task) = self.running.lock().await.take() {
            task.cancel.cancel();
            // The task finishes its in-flight step (checkpoint writes are
            // never torn) and records its own terminal status.
            if let Err(e) = task.handle.await {
                warn!(error = %e, "agent task join failed");
            }
            stopped = true;
        }

        if !stopped {
            if let Some(pid) = record.pid {
                if self.process.is_alive(pid).await {
                    if let Err(e) = self.process.terminate(pid).await {
                        warn!(pid, error = %e, "failed to signal agent process");
                    }
                }
            }
        }

        let record = StatusRecord::stopped();
        self.status.write(&record).await?;
        info!("agent stopped");
        Ok(record)
    }

    /// Best-known status, with liveness reconciliation: a recorded-running
    /// run whose pid is gone is corrected to failed.
    pub async fn status(&self) -> Result<StatusRecord> {
        let record = self.status.read().await;
        if record.status == AgentStatus::Running {
            if let Some(pid) = record.pid {
                if !self.process.is_alive(pid).await {
                    warn!(pid, "recorded run is dead, marking failed");
                    let corrected = StatusRecord::failed("agent process died unexpectedly");
                    self.status.write(&corrected).await?;
                    return Ok(corrected);
                }
            }
        }
        Ok(record)
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }
}
