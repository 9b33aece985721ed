pub mod confidence;
pub mod types;

pub use types::{DocSection, DocumentationTask, TaskType};

use std::collections::BTreeMap;

use crate::analysis::{ChangeType, StructuredChange};
use tracing::debug;

/// Associates a change signal with the task it calls for.
pub struct MappingRule {
    pub name: &'static str,
    pub matches: fn(&StructuredChange) -> bool,
    pub task_type: TaskType,
    pub section: DocSection,
    pub base_confidence: f32,
    pub base_priority: u8,
}

/// Fixed, ordered rule table. Every matching rule produces a candidate task.
static MAPPING_RULES: &[MappingRule] = &[
    MappingRule {
        name: "breaking-changes",
        matches: |c| !c.breaking_changes.is_empty(),
        task_type: TaskType::UpgradeGuide,
        section: DocSection::Migration,
        base_confidence: 0.9,
        base_priority: 10,
    },
    MappingRule {
        name: "endpoints",
        matches: |c| !c.endpoints.is_empty(),
        task_type: TaskType::ApiReference,
        section: DocSection::ApiDocs,
        base_confidence: 0.7,
        base_priority: 8,
    },
    MappingRule {
        name: "public-symbols",
        matches: has_public_api_symbol,
        task_type: TaskType::ApiReference,
        section: DocSection::ApiDocs,
        base_confidence: 0.6,
        base_priority: 6,
    },
    MappingRule {
        name: "configs",
        matches: |c| !c.configs.is_empty(),
        task_type: TaskType::ConfigReference,
        section: DocSection::Configuration,
        base_confidence: 0.6,
        base_priority: 5,
    },
    MappingRule {
        name: "migrations",
        matches: |c| !c.migrations.is_empty(),
        task_type: TaskType::MigrationGuide,
        section: DocSection::Migration,
        base_confidence: 0.7,
        base_priority: 7,
    },
    MappingRule {
        name: "new-features",
        matches: |c| !c.new_features.is_empty(),
        task_type: TaskType::FeatureGuide,
        section: DocSection::Tutorials,
        base_confidence: 0.6,
        base_priority: 6,
    },
    MappingRule {
        name: "notable-impact",
        matches: |c| c.impact_score >= 0.4,
        task_type: TaskType::ChangelogEntry,
        section: DocSection::Changelog,
        base_confidence: 0.8,
        base_priority: 4,
    },
];

fn has_public_api_symbol(change: &StructuredChange) -> bool {
    use crate::analysis::types::SymbolKind;
    change.symbols.iter().any(|s| {
        s.is_public
            && matches!(
                s.kind,
                SymbolKind::Function | SymbolKind::Method | SymbolKind::Class
            )
    })
}

/// Maps structured changes to prioritized, confidence-scored documentation
/// tasks. Deterministic and order-stable.
pub struct DocumentationTaskPlanner;

impl DocumentationTaskPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan tasks for all changes, deduplicate overlapping candidates, and
    /// sort by priority descending with confidence as the tie-breaker.
    pub fn plan(&self, changes: &[StructuredChange]) -> Vec<DocumentationTask> {
        let mut candidates = Vec::new();
        for change in changes {
            for rule in MAPPING_RULES {
                if (rule.matches)(change) {
                    candidates.push(build_task(rule, change));
                }
            }
        }
        debug!(candidates = candidates.len(), "planned candidate tasks");

        let mut tasks = deduplicate(candidates);
        tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.confidence.total_cmp(&a.confidence))
        });
        tasks
    }
}

impl Default for DocumentationTaskPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only the highest-confidence task per (source file, task type) group,
/// merging metadata from the losers.
fn deduplicate(candidates: Vec<DocumentationTask>) -> Vec<DocumentationTask> {
    let mut kept: Vec<DocumentationTask> = Vec::new();
    for candidate in candidates {
        let key = (
            candidate.source_change.file_path.clone(),
            candidate.task_type,
        );
        match kept
            .iter_mut()
            .find(|t| (t.source_change.file_path.clone(), t.task_type) == key)
        {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    let mut merged = candidate;
                    for (k, v) in std::mem::take(&mut existing.metadata) {
                        merged.metadata.entry(k).or_insert(v);
                    }
                    *existing = merged;
                } else {
                    for (k, v) in candidate.metadata {
                        existing.metadata.entry(k).or_insert(v);
                    }
                }
            }
            None => kept.push(candidate),
        }
    }
    kept
}

fn build_task(rule: &MappingRule, change: &StructuredChange) -> DocumentationTask {
    let confidence = confidence::score(rule.task_type, rule.base_confidence, change);
    let auto_generate = confidence >= 0.8 && rule.task_type != TaskType::UpgradeGuide;

    let mut metadata = BTreeMap::new();
    metadata.insert("rule".to_string(), rule.name.to_string());
    metadata.insert(
        "impact_score".to_string(),
        format!("{:.2}", change.impact_score),
    );
    metadata.insert("category".to_string(), change.category.to_string());

    DocumentationTask {
        task_type: rule.task_type,
        target_section: rule.section,
        title: title_for(rule.task_type, change),
        description: description_for(rule.task_type, change),
        content_template: template_for(rule.task_type, change),
        source_change: change.clone(),
        confidence,
        priority: rule.base_priority,
        auto_generate,
        suggested_files: suggested_files_for(rule.task_type, change),
        metadata,
    }
}

fn title_for(task_type: TaskType, change: &StructuredChange) -> String {
    match task_type {
        TaskType::ApiReference => format!("Update API reference for {}", change.file_path),
        TaskType::ConfigReference => {
            format!("Document configuration changes in {}", change.file_path)
        }
        TaskType::FeatureGuide => format!("Write a guide for new features in {}", change.file_path),
        TaskType::ChangelogEntry => format!("Add changelog entry for {}", change.file_path),
        TaskType::UpgradeGuide => format!("Document breaking changes in {}", change.file_path),
        TaskType::MigrationGuide => format!("Document schema migration {}", change.file_path),
    }
}

fn description_for(task_type: TaskType, change: &StructuredChange) -> String {
    let mut parts = Vec::new();
    match task_type {
        TaskType::ApiReference => {
            for s in &change.symbols {
                if s.is_public {
                    parts.push(format!("{} `{}`", s.kind, s.name));
                }
            }
            for e in &change.endpoints {
                parts.push(format!("{} {}", e.method, e.path));
            }
        }
        TaskType::ConfigReference => {
            for c in &change.configs {
                parts.push(c.key.clone());
            }
        }
        TaskType::FeatureGuide => parts.extend(change.new_features.iter().cloned()),
        TaskType::UpgradeGuide => parts.extend(change.breaking_changes.iter().cloned()),
        TaskType::MigrationGuide => {
            for m in &change.migrations {
                parts.push(format!("migration {} ({})", m.version, m.description));
            }
        }
        TaskType::ChangelogEntry => {
            parts.push(format!("{} change to {}", change.category, change.file_path));
        }
    }
    if parts.is_empty() {
        format!("Documentation follow-up for {}", change.file_path)
    } else {
        parts.join("; ")
    }
}

/// Mechanical markdown skeleton for the task. Finished prose comes from the
/// external content collaborator; this is what gets written without it.
fn template_for(task_type: TaskType, change: &StructuredChange) -> String {
    let mut out = format!("## {}\n\n", title_for(task_type, change));
    match task_type {
        TaskType::ApiReference => {
            for s in change.symbols.iter().filter(|s| s.is_public) {
                out.push_str(&format!("### `{}`\n\n```\n{}\n```\n\n", s.name, s.signature));
                if let Some(doc) = &s.docstring {
                    out.push_str(&format!("{}\n\n", doc));
                }
            }
            for e in &change.endpoints {
                let handler = e.handler.as_deref().unwrap_or("unknown");
                out.push_str(&format!("### `{} {}`\n\nHandler: `{}`\n\n", e.method, e.path, handler));
            }
        }
        TaskType::ConfigReference => {
            out.push_str("| Key | Old value | New value |\n|---|---|---|\n");
            for c in &change.configs {
                out.push_str(&format!(
                    "| `{}` | {} | {} |\n",
                    c.key,
                    c.old_value.as_deref().unwrap_or("-"),
                    c.new_value.as_deref().unwrap_or("-")
                ));
            }
            out.push('\n');
        }
        TaskType::FeatureGuide => {
            for feature in &change.new_features {
                out.push_str(&format!("- {}\n", feature));
            }
            out.push('\n');
        }
        TaskType::ChangelogEntry => {
            out.push_str(&format!(
                "- {}: {} (impact {:.2})\n\n",
                change.category, change.file_path, change.impact_score
            ));
        }
        TaskType::UpgradeGuide => {
            for item in &change.breaking_changes {
                out.push_str(&format!("- {}\n", item));
            }
            out.push('\n');
        }
        TaskType::MigrationGuide => {
            for m in &change.migrations {
                out.push_str(&format!(
                    "### Migration {}\n\n{}\n\nTables: {}\nOperations: {}\n\n",
                    m.version,
                    m.description,
                    m.tables_affected.join(", "),
                    m.operations.join(", ")
                ));
            }
        }
    }
    out
}

fn suggested_files_for(task_type: TaskType, change: &StructuredChange) -> Vec<String> {
    match task_type {
        TaskType::ApiReference => vec!["docs/api.md".to_string()],
        TaskType::ConfigReference => vec!["docs/configuration.md".to_string()],
        TaskType::FeatureGuide => {
            let stem = std::path::Path::new(&change.file_path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "features".to_string());
            vec![format!("docs/guides/{}.md", stem)]
        }
        TaskType::ChangelogEntry => vec!["CHANGELOG.md".to_string()],
        TaskType::UpgradeGuide => vec!["docs/upgrade.md".to_string()],
        TaskType::MigrationGuide => vec!["docs/migrations.md".to_string()],
    }
}
