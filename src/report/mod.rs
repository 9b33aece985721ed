pub mod types;

pub use types::{PatchOutcome, PatchStatus, Report, TaskReportEntry};

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Merge the pipeline's stages into a Report.
pub fn build(
    diff_source: &str,
    changes: Vec<crate::analysis::StructuredChange>,
    entries: Vec<TaskReportEntry>,
    patches: Vec<PatchOutcome>,
) -> Report {
    Report {
        diff_source: diff_source.to_string(),
        changes,
        entries,
        patches,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(changes = report.changes.len(), tasks = report.entries.len()))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

fn print_terminal_report(report: &Report) {
    println!();
    println!("Documentation plan for {}", report.diff_source);
    println!(
        "Changes: {} | Tasks: {} | Patches: {}",
        report.changes.len(),
        report.entries.len(),
        report.patches.len()
    );
    println!();

    println!("═══ Detected Changes ═══");
    if report.changes.is_empty() {
        println!("  No documentation-relevant changes.");
    }
    for change in &report.changes {
        println!(
            "  • {} [{}] impact {:.2}",
            change.file_path, change.category, change.impact_score
        );
    }
    println!();

    for entry in &report.entries {
        let task = &entry.task;
        println!("═══ {} ═══", task.title);
        println!(
            "Type: {} | Priority: {} | Confidence: {:.2} | Auto: {}",
            task.task_type,
            colorize_priority(task.priority),
            task.confidence,
            if task.auto_generate { "yes" } else { "no" }
        );
        if entry.targets.is_empty() {
            println!("  No target files selected.");
        }
        for target in &entry.targets {
            let marker = if target.create_if_missing { "new" } else { "edit" };
            println!(
                "  → {} ({}, {:.2}) {}",
                target.path, marker, target.confidence, target.reason
            );
        }
        println!();
    }

    if !report.patches.is_empty() {
        println!("═══ Patches ═══");
        for patch in &report.patches {
            println!(
                "  • {} {} — {}",
                patch.action,
                patch.file_path,
                colorize_status(&patch.status)
            );
        }
        println!();
    }
}

fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str(&format!(
        "# Documentation plan for {}\n\n",
        report.diff_source
    ));
    md.push_str(&format!(
        "**Changes:** {} | **Tasks:** {} | **Patches:** {}\n\n",
        report.changes.len(),
        report.entries.len(),
        report.patches.len()
    ));

    md.push_str("## Detected Changes\n\n");
    if report.changes.is_empty() {
        md.push_str("No documentation-relevant changes.\n");
    }
    for change in &report.changes {
        md.push_str(&format!(
            "- `{}` [{}] impact {:.2}\n",
            change.file_path, change.category, change.impact_score
        ));
    }
    md.push('\n');

    for entry in &report.entries {
        let task = &entry.task;
        md.push_str(&format!("## {}\n\n", task.title));
        md.push_str(&format!(
            "**Type:** {} | **Priority:** {} | **Confidence:** {:.2} | **Auto:** {}\n\n",
            task.task_type,
            task.priority,
            task.confidence,
            if task.auto_generate { "yes" } else { "no" }
        ));
        md.push_str(&format!("{}\n\n", task.description));
        for target in &entry.targets {
            let marker = if target.create_if_missing { "new" } else { "edit" };
            md.push_str(&format!(
                "- `{}` ({}, {:.2}) {}\n",
                target.path, marker, target.confidence, target.reason
            ));
        }
        md.push('\n');
    }

    if !report.patches.is_empty() {
        md.push_str("## Patches\n\n");
        for patch in &report.patches {
            md.push_str(&format!(
                "- **{}** `{}` — {}\n",
                patch.action, patch.file_path, patch.status
            ));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn colorize_priority(priority: u8) -> colored::ColoredString {
    let text = priority.to_string();
    if priority >= 8 {
        text.red().bold()
    } else if priority >= 6 {
        text.yellow().bold()
    } else {
        text.green()
    }
}

fn colorize_status(status: &PatchStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        PatchStatus::Applied => text.green().bold(),
        PatchStatus::Validated => text.green(),
        PatchStatus::Skipped(_) => text.yellow(),
        PatchStatus::Failed(_) => text.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ChangeAnalyzer;
    use crate::planner::DocumentationTaskPlanner;

    const DIFF: &str = "diff --git a/api.py b/api.py\n\
--- a/api.py\n+++ b/api.py\n\
@@ -10,0 +11,3 @@\n\
+def process_data(items):\n\
+    \"\"\"Normalize and store incoming items.\"\"\"\n\
+    return items\n";

    fn sample_report() -> Report {
        let changes = ChangeAnalyzer::new().analyze(DIFF, None);
        let tasks = DocumentationTaskPlanner::new().plan(&changes);
        let entries = tasks
            .into_iter()
            .map(|task| TaskReportEntry {
                task,
                targets: vec![],
            })
            .collect();
        build(
            "sample.patch",
            changes,
            entries,
            vec![PatchOutcome {
                file_path: "docs/api.md".to_string(),
                action: "UPDATE".to_string(),
                status: PatchStatus::Applied,
            }],
        )
    }

    #[test]
    fn test_write_markdown_report() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown_report(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Documentation plan for sample.patch"));
        assert!(content.contains("## Detected Changes"));
        assert!(content.contains("api.py"));
        assert!(content.contains("## Patches"));
        assert!(content.contains("`docs/api.md`"));
    }

    #[test]
    fn test_terminal_report_does_not_panic() {
        // Just ensure it doesn't panic
        print_terminal_report(&sample_report());
    }

    #[test]
    fn test_output_to_file() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        output(&report, Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_report_renders() {
        let report = build("empty.patch", vec![], vec![], vec![]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        output(&report, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("No documentation-relevant changes."));
    }
}
