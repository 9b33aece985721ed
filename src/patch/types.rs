//! Patch data model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatchAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for PatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PatchAction::Create => "CREATE",
            PatchAction::Update => "UPDATE",
            PatchAction::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// One reversible edit to a documentation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentationPatch {
    pub patch_id: String,
    pub action: PatchAction,
    /// Path relative to the documentation root
    pub file_path: String,
    /// Content the patch was generated against. None for CREATE.
    pub original_content: Option<String>,
    /// Content after applying. None for DELETE.
    pub new_content: Option<String>,
    /// Unified-diff preview of the edit
    pub diff: String,
    /// Live content captured at apply time, for rollback
    pub rollback_data: Option<String>,
    /// Patch this one was generated on top of, when chained
    pub parent_patch_id: Option<String>,
    pub applied: bool,
}

/// An ordered group of patches applied together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSet {
    pub patches: Vec<DocumentationPatch>,
    /// When set, a failure rolls back every previously applied member.
    pub atomic: bool,
    pub applied: bool,
}

impl PatchSet {
    pub fn new(patches: Vec<DocumentationPatch>, atomic: bool) -> Self {
        Self {
            patches,
            atomic,
            applied: false,
        }
    }
}

/// Minimal single-hunk unified diff, enough for previews and reports.
/// The common prefix and suffix are trimmed line-wise.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let mut prefix = 0;
    while prefix < old_lines.len()
        && prefix < new_lines.len()
        && old_lines[prefix] == new_lines[prefix]
    {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old_lines.len() - prefix
        && suffix < new_lines.len() - prefix
        && old_lines[old_lines.len() - 1 - suffix] == new_lines[new_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];
    if old_mid.is_empty() && new_mid.is_empty() {
        return String::new();
    }

    let mut out = format!("--- a/{}\n+++ b/{}\n", path, path);
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        prefix + 1,
        old_mid.len(),
        prefix + 1,
        new_mid.len()
    ));
    for line in old_mid {
        out.push('-');
        out.push_str(line);
        out.push('\n');
    }
    for line in new_mid {
        out.push('+');
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_trims_common_context() {
        let old = "a\nb\nc\n";
        let new = "a\nB\nc\n";
        let diff = unified_diff("docs/x.md", old, new);
        assert!(diff.contains("--- a/docs/x.md"));
        assert!(diff.contains("@@ -2,1 +2,1 @@"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+B\n"));
        assert!(!diff.contains("-a"));
    }

    #[test]
    fn test_unified_diff_identical_is_empty() {
        assert_eq!(unified_diff("x.md", "same\n", "same\n"), "");
    }

    #[test]
    fn test_unified_diff_pure_addition() {
        let diff = unified_diff("x.md", "", "hello\nworld\n");
        assert!(diff.contains("@@ -1,0 +1,2 @@"));
        assert!(diff.contains("+hello\n"));
    }

    #[test]
    fn test_action_serde_uppercase() {
        assert_eq!(
            serde_json::to_string(&PatchAction::Create).unwrap(),
            "\"CREATE\""
        );
    }
}
