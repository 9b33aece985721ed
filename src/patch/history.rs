//! Append-only patch history.
//!
//! Records are persisted as JSON lines so a crash mid-write loses at most
//! the record being written. Contents are stored as blake3 hashes; the
//! rollback payload is kept verbatim because it is what undoes the patch.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{DocumentationPatch, PatchAction};
use super::PatchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub patch_id: String,
    pub action: PatchAction,
    pub file_path: String,
    pub original_content_hash: Option<String>,
    pub new_content_hash: Option<String>,
    pub rollback_data: Option<String>,
    pub parent_patch_id: Option<String>,
    pub applied_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn from_patch(patch: &DocumentationPatch) -> Self {
        Self {
            patch_id: patch.patch_id.clone(),
            action: patch.action,
            file_path: patch.file_path.clone(),
            original_content_hash: patch.original_content.as_deref().map(content_hash),
            new_content_hash: patch.new_content.as_deref().map(content_hash),
            rollback_data: patch.rollback_data.clone(),
            parent_patch_id: patch.parent_patch_id.clone(),
            applied_at: Utc::now(),
        }
    }
}

fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Patch ledger, optionally backed by a JSONL file.
pub struct PatchHistory {
    records: Vec<HistoryRecord>,
    path: Option<PathBuf>,
}

impl PatchHistory {
    /// Ledger with no persistence. Used by dry runs and tests.
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            path: None,
        }
    }

    /// Ledger at `path`, loading any existing records. Unreadable lines are
    /// skipped with a warning rather than poisoning the whole ledger.
    pub fn at(path: &Path) -> Result<Self, PatchError> {
        let mut records = Vec::new();
        if path.is_file() {
            let content = std::fs::read_to_string(path)?;
            for (line_no, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<HistoryRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        warn!(%err, line = line_no + 1, path = %path.display(), "skipping corrupt history record");
                    }
                }
            }
        }
        Ok(Self {
            records,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn record(&mut self, patch: &DocumentationPatch) -> Result<(), PatchError> {
        let record = HistoryRecord::from_patch(patch);
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            let mut line = serde_json::to_string(&record)?;
            line.push('\n');
            file.write_all(line.as_bytes())?;
        }
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, patch_id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.patch_id == patch_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
