use std::collections::BTreeMap;

use crate::analysis::StructuredChange;

/// Kind of documentation work a change calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskType {
    ApiReference,
    ConfigReference,
    FeatureGuide,
    ChangelogEntry,
    UpgradeGuide,
    MigrationGuide,
}

impl TaskType {
    /// Canonical file name under the docs root for convention matching.
    /// The changelog lives at the repository root by convention.
    pub fn canonical_file(&self) -> &'static str {
        match self {
            TaskType::ApiReference => "api.md",
            TaskType::ConfigReference => "configuration.md",
            TaskType::FeatureGuide => "guides.md",
            TaskType::ChangelogEntry => "CHANGELOG.md",
            TaskType::UpgradeGuide => "upgrade.md",
            TaskType::MigrationGuide => "migrations.md",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskType::ApiReference => "API_REFERENCE",
            TaskType::ConfigReference => "CONFIG_REFERENCE",
            TaskType::FeatureGuide => "FEATURE_GUIDE",
            TaskType::ChangelogEntry => "CHANGELOG_ENTRY",
            TaskType::UpgradeGuide => "UPGRADE_GUIDE",
            TaskType::MigrationGuide => "MIGRATION_GUIDE",
        };
        write!(f, "{}", name)
    }
}

/// Logical documentation section a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocSection {
    ApiDocs,
    Configuration,
    Tutorials,
    Changelog,
    Migration,
}

impl std::fmt::Display for DocSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocSection::ApiDocs => "API_DOCS",
            DocSection::Configuration => "CONFIGURATION",
            DocSection::Tutorials => "TUTORIALS",
            DocSection::Changelog => "CHANGELOG",
            DocSection::Migration => "MIGRATION",
        };
        write!(f, "{}", name)
    }
}

/// A planned, confidence-scored documentation task. Created by the planner,
/// consumed by the target-file selector.
#[derive(Debug, Clone)]
pub struct DocumentationTask {
    pub task_type: TaskType,
    pub target_section: DocSection,
    pub title: String,
    pub description: String,
    /// Mechanical markdown skeleton filled from the source change. This is
    /// the content written when the task is applied; prose stays external.
    pub content_template: String,
    /// The change this task was planned from
    pub source_change: StructuredChange,
    /// Estimate (0-1) that this task is well-formed and worth generating
    pub confidence: f32,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    /// Whether the task may be generated without manual review
    pub auto_generate: bool,
    /// Candidate documentation files, relative to the repository root
    pub suggested_files: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_files() {
        assert_eq!(TaskType::ChangelogEntry.canonical_file(), "CHANGELOG.md");
        assert_eq!(TaskType::ApiReference.canonical_file(), "api.md");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TaskType::UpgradeGuide.to_string(), "UPGRADE_GUIDE");
        assert_eq!(DocSection::ApiDocs.to_string(), "API_DOCS");
    }
}
