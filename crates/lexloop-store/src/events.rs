//! Append-only audit log.
//!
//! One JSON object per line, each independently parseable. A mutex
//! serializes writers so concurrent issue loops never interleave partial
//! lines, and each entry is flushed and fsynced before `append` returns.
//! Entry order is append-completion order, not issue order.

use std::path::{Path, PathBuf};

use lexloop_core::{Error, EventEntry, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub struct EventLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry durably. The entry is on disk when this returns.
    pub async fn append(&self, entry: &EventEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persistence(format!("mkdir {}: {e}", parent.display())))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::persistence(format!("open {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::persistence(format!("append {}: {e}", self.path.display())))?;
        file.flush()
            .await
            .map_err(|e| Error::persistence(format!("flush {}: {e}", self.path.display())))?;
        file.sync_all()
            .await
            .map_err(|e| Error::persistence(format!("fsync {}: {e}", self.path.display())))?;
        Ok(())
    }

    /// Read back every durably appended entry. Blank and malformed lines
    /// (a crash-truncated tail) are skipped, not fatal.
    pub async fn read_all(&self) -> Result<Vec<EventEntry>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::persistence(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let mut entries = Vec::new();
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "skipping malformed event line"),
            }
        }
        Ok(entries)
    }

    /// Truncate the log for a fresh run.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::persistence(format!("mkdir {}: {e}", parent.display())))?;
        }
        fs::write(&self.path, "")
            .await
            .map_err(|e| Error::persistence(format!("truncate {}: {e}", self.path.display())))
    }
}
