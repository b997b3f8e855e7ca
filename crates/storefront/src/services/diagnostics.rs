//! Test-mode webhook snapshots.
//!
//! When `WEBHOOK_TEST_WRITE_FS=true`, webhook payloads that could not be
//! reconciled normally are written to the snapshot directory as pretty JSON
//! files. Writes are best-effort: failures are logged and never surface.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Value, json};

use crate::config::DiagnosticsConfig;

/// Writes diagnostic snapshot files when enabled.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    enabled: bool,
    dir: PathBuf,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            enabled: config.test_mode,
            dir: config.snapshot_dir.clone(),
        }
    }

    /// A writer that never writes.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `{event, invoiceId, data, ts}` to a new file and return its path.
    ///
    /// Returns `None` when disabled or when the write failed.
    pub async fn write(&self, invoice_id: Option<&str>, event: &str, data: &Value) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }

        let now = Utc::now();
        let file_name = match invoice_id {
            Some(id) => format!("webhook-{}-{}.json", sanitize(id), now.timestamp_millis()),
            None => format!("webhook-{}.json", now.timestamp_millis()),
        };
        let path = self.dir.join(file_name);
        let snapshot = json!({
            "event": event,
            "invoiceId": invoice_id,
            "data": data,
            "ts": kaalika_core::timestamp::format(&now),
        });

        let contents = match serde_json::to_vec_pretty(&snapshot) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode webhook snapshot");
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to create snapshot directory");
            return None;
        }
        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), event, "Wrote webhook snapshot");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write webhook snapshot");
                None
            }
        }
    }
}

/// Keep invoice ids from escaping the snapshot directory.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
