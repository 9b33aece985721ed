use crate::analysis::StructuredChange;
use crate::planner::DocumentationTask;
use crate::targets::TargetFile;

/// One planned task together with the files selected for it.
#[derive(Debug)]
pub struct TaskReportEntry {
    pub task: DocumentationTask,
    pub targets: Vec<TargetFile>,
}

/// What happened to one patch during the apply phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchStatus {
    Applied,
    Validated,
    Skipped(String),
    Failed(String),
}

impl std::fmt::Display for PatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchStatus::Applied => write!(f, "applied"),
            PatchStatus::Validated => write!(f, "validated (dry run)"),
            PatchStatus::Skipped(reason) => write!(f, "skipped: {}", reason),
            PatchStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub file_path: String,
    pub action: String,
    pub status: PatchStatus,
}

/// Full pipeline result for one diff.
#[derive(Debug)]
pub struct Report {
    /// Where the diff came from, for the header line
    pub diff_source: String,
    pub changes: Vec<StructuredChange>,
    pub entries: Vec<TaskReportEntry>,
    pub patches: Vec<PatchOutcome>,
}
