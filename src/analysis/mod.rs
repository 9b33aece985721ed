pub mod breaking;
pub mod configs;
pub mod endpoints;
pub mod migrations;
pub mod symbols;
pub mod types;

pub use types::{
    ChangeCategory, ChangeType, ChangedEndpoint, ChangedSymbol, ConfigChange, MigrationChange,
    StructuredChange,
};

use crate::diff::{self, FileDiff};
use thiserror::Error;
use tracing::{debug, warn};

/// A single extractor failed on one file. Recovered locally: the other
/// extractors and files are unaffected.
#[derive(Debug, Error)]
#[error("{extractor} extractor failed on {file}: {reason}")]
pub struct ExtractionError {
    pub extractor: &'static str,
    pub file: String,
    pub reason: String,
}

/// Turns a parsed diff into one StructuredChange per changed file.
pub struct ChangeAnalyzer;

impl ChangeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a unified diff, with an optional commit message feeding the
    /// bug-fix heuristic. One StructuredChange per file, in source order.
    pub fn analyze(&self, diff_text: &str, commit_message: Option<&str>) -> Vec<StructuredChange> {
        let files = diff::parse(diff_text);
        files
            .iter()
            .map(|file| self.analyze_file(file, commit_message))
            .collect()
    }

    fn analyze_file(&self, file: &FileDiff, commit_message: Option<&str>) -> StructuredChange {
        let symbols = run_extractor("symbol", file, symbols::extract(file));
        let endpoints = run_extractor("endpoint", file, endpoints::extract(file));
        let configs = run_extractor("config", file, configs::extract(file));
        let migrations = run_extractor("migration", file, migrations::extract(file));
        let breaking_changes = run_extractor("breaking", file, breaking::detect(file, &symbols));
        let new_features = detect_new_features(&symbols, &breaking_changes);

        let change_type = if file.is_new {
            ChangeType::Added
        } else if file.is_deleted {
            ChangeType::Deleted
        } else {
            ChangeType::Modified
        };

        let category = categorize(
            file,
            &symbols,
            &endpoints,
            &configs,
            &migrations,
            &breaking_changes,
            &new_features,
            commit_message,
        );
        let impact_score = impact_score(category, &symbols, &endpoints, &breaking_changes);
        debug!(file = %file.file_path, %category, impact_score, "analyzed file");

        StructuredChange {
            file_path: file.file_path.clone(),
            change_type,
            category,
            symbols,
            endpoints,
            configs,
            migrations,
            breaking_changes,
            new_features,
            impact_score,
        }
    }
}

impl Default for ChangeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn run_extractor<T>(
    name: &'static str,
    file: &FileDiff,
    result: Result<Vec<T>, ExtractionError>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            warn!(extractor = name, file = %file.file_path, %err, "extractor failed, skipping");
            Vec::new()
        }
    }
}

/// Human-readable descriptions for every newly added public symbol, unless
/// the file carries an explicit breaking marker.
fn detect_new_features(symbols: &[ChangedSymbol], breaking_changes: &[String]) -> Vec<String> {
    if !breaking_changes.is_empty() {
        return Vec::new();
    }
    symbols
        .iter()
        .filter(|s| s.change_type == ChangeType::Added && s.is_public)
        .map(|s| match &s.docstring {
            Some(doc) => format!("New {} `{}`: {}", s.kind, s.name, doc),
            None => format!("New {} `{}` in {}", s.kind, s.name, s.file_path),
        })
        .collect()
}

/// Assign the category. First rule wins, in this priority order.
#[allow(clippy::too_many_arguments)]
fn categorize(
    file: &FileDiff,
    symbols: &[ChangedSymbol],
    endpoints: &[ChangedEndpoint],
    configs: &[ConfigChange],
    migrations: &[MigrationChange],
    breaking_changes: &[String],
    new_features: &[String],
    commit_message: Option<&str>,
) -> ChangeCategory {
    if !breaking_changes.is_empty() {
        return ChangeCategory::BreakingChange;
    }
    if !endpoints.is_empty() {
        return ChangeCategory::ApiChange;
    }
    if !configs.is_empty() && symbols.is_empty() {
        return ChangeCategory::ConfigChange;
    }
    if !migrations.is_empty() {
        return ChangeCategory::Migration;
    }
    if !new_features.is_empty() {
        return ChangeCategory::NewFeature;
    }
    if looks_like_bug_fix(&file.file_path, commit_message) {
        return ChangeCategory::BugFix;
    }
    // Body-only edits to a recognized source file, without new public names,
    // read as a refactor.
    let is_code_file = symbols::matcher_for(&file.extension()).is_some();
    let has_edits = !file.added_lines.is_empty() || !file.removed_lines.is_empty();
    let new_public = symbols
        .iter()
        .any(|s| s.change_type == ChangeType::Added && s.is_public);
    if is_code_file && has_edits && !new_public {
        return ChangeCategory::Refactor;
    }
    ChangeCategory::Other
}

/// Bug-fix heuristic: the commit message contains a defect-correction word,
/// or the file path itself does.
fn looks_like_bug_fix(file_path: &str, commit_message: Option<&str>) -> bool {
    const HINTS: &[&str] = &["fix", "bug", "hotfix", "regression", "issue #"];
    if let Some(message) = commit_message {
        let lower = message.to_lowercase();
        if HINTS.iter().any(|h| lower.contains(h)) {
            return true;
        }
    }
    let path = file_path.to_lowercase();
    path.contains("fix") || path.contains("bug")
}

/// `clamp(category_weight + 0.05*symbols + 0.05*endpoints + 0.2*breaking, 0, 1)`
fn impact_score(
    category: ChangeCategory,
    symbols: &[ChangedSymbol],
    endpoints: &[ChangedEndpoint],
    breaking_changes: &[String],
) -> f32 {
    let score = category.weight()
        + 0.05 * symbols.len() as f32
        + 0.05 * endpoints.len() as f32
        + 0.2 * breaking_changes.len() as f32;
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_FEATURE_DIFF: &str = "diff --git a/api.py b/api.py\n\
--- a/api.py\n+++ b/api.py\n\
@@ -10,0 +11,3 @@\n\
+def process_data(items):\n\
+    \"\"\"Normalize and store incoming items.\"\"\"\n\
+    return items\n";

    const BREAKING_DIFF: &str = "diff --git a/api.py b/api.py\n\
--- a/api.py\n+++ b/api.py\n\
@@ -5,2 +5,1 @@\n\
 # BREAKING CHANGE: export_report was removed\n\
-def export_report(rows):\n";

    #[test]
    fn test_new_public_function_is_new_feature() {
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(NEW_FEATURE_DIFF, None);
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.category, ChangeCategory::NewFeature);
        assert!(
            (0.4..=0.8).contains(&change.impact_score),
            "{}",
            change.impact_score
        );
        assert_eq!(change.new_features.len(), 1);
    }

    #[test]
    fn test_breaking_marker_wins_over_new_feature() {
        let diff = "diff --git a/api.py b/api.py\n\
--- a/api.py\n+++ b/api.py\n\
@@ -1,0 +1,3 @@\n\
+# BREAKING: payloads are now versioned\n\
+def encode_payload(data):\n\
+    return data\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, None);
        assert_eq!(changes[0].category, ChangeCategory::BreakingChange);
        assert!(changes[0].new_features.is_empty());
    }

    #[test]
    fn test_removed_public_fn_with_marker_scores_high() {
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(BREAKING_DIFF, None);
        let change = &changes[0];
        assert_eq!(change.category, ChangeCategory::BreakingChange);
        assert!(change.impact_score >= 0.9, "{}", change.impact_score);
    }

    #[test]
    fn test_impact_score_is_clamped() {
        let analyzer = ChangeAnalyzer::new();
        for change in analyzer.analyze(BREAKING_DIFF, None) {
            assert!((0.0..=1.0).contains(&change.impact_score));
        }
    }

    #[test]
    fn test_config_only_change() {
        let diff = "diff --git a/settings.py b/settings.py\n\
--- a/settings.py\n+++ b/settings.py\n\
@@ -1,1 +1,1 @@\n\
-CACHE_TTL = 60\n\
+CACHE_TTL = 300\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, None);
        assert_eq!(changes[0].category, ChangeCategory::ConfigChange);
        assert_eq!(changes[0].configs.len(), 1);
    }

    #[test]
    fn test_endpoint_change_is_api_change() {
        let diff = "diff --git a/app.py b/app.py\n\
--- a/app.py\n+++ b/app.py\n\
@@ -1,0 +1,3 @@\n\
+@app.get(\"/health\")\n\
+def health():\n\
+    return \"ok\"\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, None);
        assert_eq!(changes[0].category, ChangeCategory::ApiChange);
    }

    #[test]
    fn test_migration_file() {
        let diff = "diff --git a/migrations/0007_add_users.sql b/migrations/0007_add_users.sql\n\
--- /dev/null\n+++ b/migrations/0007_add_users.sql\n\
@@ -0,0 +1,1 @@\n\
+CREATE TABLE users (id INT);\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, None);
        assert_eq!(changes[0].category, ChangeCategory::Migration);
    }

    #[test]
    fn test_commit_message_drives_bug_fix() {
        let diff = "diff --git a/src/handler.py b/src/handler.py\n\
--- a/src/handler.py\n+++ b/src/handler.py\n\
@@ -3,1 +3,1 @@\n\
-    total = total\n\
+    total = total + 1\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, Some("fix off-by-one in totals"));
        assert_eq!(changes[0].category, ChangeCategory::BugFix);
        // same edit without the hint reads as a refactor
        let changes = analyzer.analyze(diff, Some("tidy up totals"));
        assert_eq!(changes[0].category, ChangeCategory::Refactor);
    }

    #[test]
    fn test_non_code_file_is_other() {
        let diff = "diff --git a/README.md b/README.md\n\
--- a/README.md\n+++ b/README.md\n\
@@ -1,1 +1,1 @@\n\
-old text\n\
+new text\n";
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(diff, None);
        assert_eq!(changes[0].category, ChangeCategory::Other);
    }

    #[test]
    fn test_one_change_per_file() {
        let diff = format!(
            "{}{}",
            NEW_FEATURE_DIFF,
            "diff --git a/settings.py b/settings.py\n\
--- a/settings.py\n+++ b/settings.py\n\
@@ -1,0 +1,1 @@\n\
+RATE_LIMIT = 20\n"
        );
        let analyzer = ChangeAnalyzer::new();
        let changes = analyzer.analyze(&diff, None);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].file_path, "api.py");
        assert_eq!(changes[1].file_path, "settings.py");
    }
}
