//! Patch generation, application, and rollback.
//!
//! Patches are generated against a snapshot of the file and guarded at
//! apply time: an UPDATE only lands if the live content still matches the
//! snapshot, so concurrent edits fail loudly instead of being clobbered.

pub mod history;
pub mod types;

pub use history::{HistoryRecord, PatchHistory};
pub use types::{unified_diff, DocumentationPatch, PatchAction, PatchSet};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("cannot create {0}: file already exists")]
    AlreadyExists(String),

    #[error("content of {0} changed since the patch was generated")]
    ContentMismatch(String),

    #[error("patch for {0} is missing {1} content")]
    MissingContent(String, &'static str),

    #[error("patch {0} has not been applied")]
    NotApplied(String),

    #[error("path escapes the documentation root: {0}")]
    OutsideRoot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("history record failed: {0}")]
    History(#[from] serde_json::Error),

    #[error("apply failed ({apply}) and rollback also failed ({rollback})")]
    AtomicRollback {
        apply: Box<PatchError>,
        rollback: Box<PatchError>,
    },
}

/// Documentation files under one root. All paths are relative and checked
/// against escaping the root.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn resolve(&self, rel_path: &str) -> Result<PathBuf, PatchError> {
        let rel = Path::new(rel_path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(PatchError::OutsideRoot(rel_path.to_string()));
        }
        Ok(self.root.join(rel))
    }

    pub fn exists(&self, rel_path: &str) -> Result<bool, PatchError> {
        Ok(self.resolve(rel_path)?.is_file())
    }

    pub fn read(&self, rel_path: &str) -> Result<Option<String>, PatchError> {
        let path = self.resolve(rel_path)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    pub fn write(&self, rel_path: &str, content: &str) -> Result<(), PatchError> {
        let path = self.resolve(rel_path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn delete(&self, rel_path: &str) -> Result<(), PatchError> {
        std::fs::remove_file(self.resolve(rel_path)?)?;
        Ok(())
    }
}

/// Generates and applies reversible documentation patches.
pub struct PatchGenerator {
    store: FileStore,
    history: PatchHistory,
}

impl PatchGenerator {
    pub fn new(root: &Path) -> Self {
        Self {
            store: FileStore::new(root),
            history: PatchHistory::in_memory(),
        }
    }

    pub fn with_history(root: &Path, history: PatchHistory) -> Self {
        Self {
            store: FileStore::new(root),
            history,
        }
    }

    pub fn history(&self) -> &PatchHistory {
        &self.history
    }

    /// Generate a patch against the file's current content. The action is
    /// derived from what exists rather than passed in: no file and some
    /// content is a CREATE, a file and no content is a DELETE, otherwise an
    /// UPDATE. Callers used to supplying the action explicitly get the same
    /// apply-time semantics; a supplied action could only agree with or
    /// contradict the snapshot the patch is generated from.
    pub fn generate(
        &self,
        file_path: &str,
        new_content: Option<&str>,
    ) -> Result<DocumentationPatch, PatchError> {
        let original = self.store.read(file_path)?;
        let action = match (&original, new_content) {
            (None, Some(_)) => PatchAction::Create,
            (Some(_), None) => PatchAction::Delete,
            (Some(_), Some(_)) => PatchAction::Update,
            (None, None) => {
                return Err(PatchError::MissingContent(file_path.to_string(), "new"));
            }
        };
        let diff = unified_diff(
            file_path,
            original.as_deref().unwrap_or(""),
            new_content.unwrap_or(""),
        );
        debug!(file_path, %action, "generated patch");
        Ok(DocumentationPatch {
            patch_id: Uuid::new_v4().to_string(),
            action,
            file_path: file_path.to_string(),
            original_content: original,
            new_content: new_content.map(|c| c.to_string()),
            diff,
            rollback_data: None,
            parent_patch_id: None,
            applied: false,
        })
    }

    /// Generate a patch on top of an unapplied base patch, so chained edits
    /// to one file validate against the base's output rather than the disk.
    pub fn generate_incremental(
        &self,
        base: &DocumentationPatch,
        new_content: &str,
    ) -> Result<DocumentationPatch, PatchError> {
        let original = base
            .new_content
            .clone()
            .ok_or_else(|| PatchError::MissingContent(base.file_path.clone(), "new"))?;
        let diff = unified_diff(&base.file_path, &original, new_content);
        Ok(DocumentationPatch {
            patch_id: Uuid::new_v4().to_string(),
            action: PatchAction::Update,
            file_path: base.file_path.clone(),
            original_content: Some(original),
            new_content: Some(new_content.to_string()),
            diff,
            rollback_data: None,
            parent_patch_id: Some(base.patch_id.clone()),
            applied: false,
        })
    }

    /// Apply one patch. With `dry_run` every validation runs but nothing is
    /// written and the patch stays unapplied.
    pub fn apply(
        &mut self,
        patch: &mut DocumentationPatch,
        dry_run: bool,
    ) -> Result<(), PatchError> {
        match patch.action {
            PatchAction::Create => {
                let content = patch
                    .new_content
                    .as_deref()
                    .ok_or_else(|| PatchError::MissingContent(patch.file_path.clone(), "new"))?;
                if self.store.exists(&patch.file_path)? {
                    return Err(PatchError::AlreadyExists(patch.file_path.clone()));
                }
                if dry_run {
                    return Ok(());
                }
                self.store.write(&patch.file_path, content)?;
            }
            PatchAction::Update => {
                let content = patch
                    .new_content
                    .as_deref()
                    .ok_or_else(|| PatchError::MissingContent(patch.file_path.clone(), "new"))?;
                // Without a snapshot there is nothing to guard against and
                // nothing to roll back to; such a patch must not write.
                let original = patch.original_content.as_deref().ok_or_else(|| {
                    PatchError::MissingContent(patch.file_path.clone(), "original")
                })?;
                let live = self.store.read(&patch.file_path)?;
                if live.as_deref() != Some(original) {
                    return Err(PatchError::ContentMismatch(patch.file_path.clone()));
                }
                if dry_run {
                    return Ok(());
                }
                patch.rollback_data = live;
                self.store.write(&patch.file_path, content)?;
            }
            PatchAction::Delete => {
                let live = self.store.read(&patch.file_path)?;
                if live.is_none() {
                    return Err(PatchError::ContentMismatch(patch.file_path.clone()));
                }
                if let Some(original) = &patch.original_content {
                    if live.as_deref() != Some(original.as_str()) {
                        return Err(PatchError::ContentMismatch(patch.file_path.clone()));
                    }
                }
                if dry_run {
                    return Ok(());
                }
                patch.rollback_data = live;
                self.store.delete(&patch.file_path)?;
            }
        }
        patch.applied = true;
        self.history.record(patch)?;
        info!(file_path = %patch.file_path, action = %patch.action, "applied patch");
        Ok(())
    }

    /// Apply a set in order. Atomic sets roll back the applied prefix in
    /// reverse on the first failure; non-atomic sets keep going and report
    /// every failure.
    pub fn apply_set(
        &mut self,
        set: &mut PatchSet,
        dry_run: bool,
    ) -> Result<(), Vec<PatchError>> {
        let mut errors = Vec::new();
        let mut applied_indices = Vec::new();

        for index in 0..set.patches.len() {
            match self.apply(&mut set.patches[index], dry_run) {
                Ok(()) => applied_indices.push(index),
                Err(err) => {
                    if set.atomic {
                        warn!(%err, "atomic patch set failed, rolling back");
                        let mut apply_err = Some(err);
                        for &done in applied_indices.iter().rev() {
                            if dry_run {
                                continue;
                            }
                            if let Err(rollback_err) = self.rollback(&mut set.patches[done]) {
                                match apply_err.take() {
                                    Some(apply) => errors.push(PatchError::AtomicRollback {
                                        apply: Box::new(apply),
                                        rollback: Box::new(rollback_err),
                                    }),
                                    None => errors.push(rollback_err),
                                }
                            }
                        }
                        if let Some(err) = apply_err {
                            errors.push(err);
                        }
                        return Err(errors);
                    }
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            set.applied = !dry_run;
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Undo an applied patch, restoring the exact bytes from apply time.
    pub fn rollback(&mut self, patch: &mut DocumentationPatch) -> Result<(), PatchError> {
        if !patch.applied {
            return Err(PatchError::NotApplied(patch.patch_id.clone()));
        }
        match patch.action {
            PatchAction::Create => {
                self.store.delete(&patch.file_path)?;
            }
            PatchAction::Update | PatchAction::Delete => {
                let data = patch.rollback_data.as_deref().ok_or_else(|| {
                    PatchError::MissingContent(patch.file_path.clone(), "rollback")
                })?;
                self.store.write(&patch.file_path, data)?;
            }
        }
        patch.applied = false;
        info!(file_path = %patch.file_path, action = %patch.action, "rolled back patch");
        Ok(())
    }

    /// Roll back every applied member, last first.
    pub fn rollback_set(&mut self, set: &mut PatchSet) -> Result<(), Vec<PatchError>> {
        let mut errors = Vec::new();
        for patch in set.patches.iter_mut().rev() {
            if patch.applied {
                if let Err(err) = self.rollback(patch) {
                    errors.push(err);
                }
            }
        }
        if errors.is_empty() {
            set.applied = false;
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_generate_derives_action() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("existing.md"), "old\n").unwrap();
        let generator = PatchGenerator::new(dir.path());

        let create = generator.generate("new.md", Some("content\n")).unwrap();
        assert_eq!(create.action, PatchAction::Create);
        assert!(create.original_content.is_none());

        let update = generator.generate("existing.md", Some("new\n")).unwrap();
        assert_eq!(update.action, PatchAction::Update);
        assert!(update.diff.contains("-old"));
        assert!(update.diff.contains("+new"));

        let delete = generator.generate("existing.md", None).unwrap();
        assert_eq!(delete.action, PatchAction::Delete);
    }

    #[test]
    fn test_create_on_existing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", Some("v1\n")).unwrap();
        generator.apply(&mut patch, false).unwrap();

        let mut again = patch.clone();
        again.applied = false;
        let err = generator.apply(&mut again, false).unwrap_err();
        assert!(matches!(err, PatchError::AlreadyExists(_)));
    }

    #[test]
    fn test_update_guards_against_concurrent_edit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "original\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", Some("patched\n")).unwrap();

        // someone else edits the file after the patch was generated
        fs::write(dir.path().join("a.md"), "edited elsewhere\n").unwrap();
        let err = generator.apply(&mut patch, false).unwrap_err();
        assert!(matches!(err, PatchError::ContentMismatch(_)));
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "edited elsewhere\n"
        );
    }

    #[test]
    fn test_dry_run_validates_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", Some("content\n")).unwrap();
        generator.apply(&mut patch, true).unwrap();
        assert!(!patch.applied);
        assert!(!dir.path().join("a.md").exists());
        assert!(generator.history().is_empty());
    }

    #[test]
    fn test_rollback_restores_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "before\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", Some("after\n")).unwrap();
        generator.apply(&mut patch, false).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "after\n");

        generator.rollback(&mut patch).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "before\n"
        );
        assert!(!patch.applied);
    }

    #[test]
    fn test_rollback_of_delete_recreates_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "keep me\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", None).unwrap();
        generator.apply(&mut patch, false).unwrap();
        assert!(!dir.path().join("a.md").exists());

        generator.rollback(&mut patch).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "keep me\n"
        );
    }

    #[test]
    fn test_rollback_requires_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut patch = generator.generate("a.md", Some("x\n")).unwrap();
        let err = generator.rollback(&mut patch).unwrap_err();
        assert!(matches!(err, PatchError::NotApplied(_)));
    }

    #[test]
    fn test_atomic_set_rolls_back_applied_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker.md"), "present\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());

        let first = generator.generate("one.md", Some("one\n")).unwrap();
        // second patch must fail: CREATE of an existing file
        let mut second = generator.generate("two.md", Some("two\n")).unwrap();
        second.file_path = "blocker.md".to_string();

        let mut set = PatchSet::new(vec![first, second], true);
        let errors = generator.apply_set(&mut set, false).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PatchError::AlreadyExists(_)));
        // the applied prefix was undone
        assert!(!dir.path().join("one.md").exists());
        assert!(!set.applied);
    }

    #[test]
    fn test_non_atomic_set_collects_errors_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker.md"), "present\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());

        let mut failing = generator.generate("x.md", Some("x\n")).unwrap();
        failing.file_path = "blocker.md".to_string();
        let ok = generator.generate("y.md", Some("y\n")).unwrap();

        let mut set = PatchSet::new(vec![failing, ok], false);
        let errors = generator.apply_set(&mut set, false).unwrap_err();
        assert_eq!(errors.len(), 1);
        // the later patch still landed
        assert!(dir.path().join("y.md").exists());
    }

    #[test]
    fn test_update_without_original_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blocker.md"), "present\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());

        // hand-built UPDATE with no snapshot, aimed at a missing file
        let degenerate = DocumentationPatch {
            patch_id: "degenerate".to_string(),
            action: PatchAction::Update,
            file_path: "ghost.md".to_string(),
            original_content: None,
            new_content: Some("sneaky\n".to_string()),
            diff: String::new(),
            rollback_data: None,
            parent_patch_id: None,
            applied: false,
        };
        let mut failing = generator.generate("x.md", Some("x\n")).unwrap();
        failing.file_path = "blocker.md".to_string();

        let mut set = PatchSet::new(vec![degenerate, failing], true);
        let errors = generator.apply_set(&mut set, false).unwrap_err();
        assert!(matches!(errors[0], PatchError::MissingContent(_, "original")));
        // post-state equals pre-state: nothing was ever written
        assert!(!dir.path().join("ghost.md").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("blocker.md")).unwrap(),
            "present\n"
        );
    }

    #[test]
    fn test_failed_rollback_surfaces_both_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.md"), "keep\n").unwrap();
        fs::write(dir.path().join("blocker.md"), "present\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());

        // deleting x.md then creating x.md/nested.md turns the rollback
        // target into a directory, so restoring x.md cannot succeed
        let delete = generator.generate("x.md", None).unwrap();
        let shadow = generator.generate("x.md/nested.md", Some("n\n")).unwrap();
        let mut failing = generator.generate("y.md", Some("y\n")).unwrap();
        failing.file_path = "blocker.md".to_string();

        let mut set = PatchSet::new(vec![delete, shadow, failing], true);
        let errors = generator.apply_set(&mut set, false).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            PatchError::AtomicRollback { apply, .. }
                if matches!(**apply, PatchError::AlreadyExists(_))
        )));
    }

    #[test]
    fn test_incremental_patch_chains_parent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "v1\n").unwrap();
        let mut generator = PatchGenerator::new(dir.path());
        let mut base = generator.generate("a.md", Some("v2\n")).unwrap();
        let mut next = generator.generate_incremental(&base, "v3\n").unwrap();
        assert_eq!(next.parent_patch_id.as_deref(), Some(base.patch_id.as_str()));
        assert_eq!(next.original_content.as_deref(), Some("v2\n"));

        generator.apply(&mut base, false).unwrap();
        generator.apply(&mut next, false).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "v3\n");
    }

    #[test]
    fn test_paths_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let generator = PatchGenerator::new(dir.path());
        let err = generator.generate("../outside.md", Some("x\n")).unwrap_err();
        assert!(matches!(err, PatchError::OutsideRoot(_)));
    }

    #[test]
    fn test_applied_patches_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join(".docsmith/history.jsonl");
        let history = PatchHistory::at(&history_path).unwrap();
        let mut generator = PatchGenerator::with_history(dir.path(), history);

        let mut patch = generator.generate("a.md", Some("content\n")).unwrap();
        generator.apply(&mut patch, false).unwrap();
        assert_eq!(generator.history().len(), 1);
        assert!(history_path.is_file());
    }
}
