/// Kind of a single line inside a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
    Context,
}

/// One line of a hunk, without its +/-/space prefix.
#[derive(Debug, Clone)]
pub struct LineChange {
    pub kind: ChangeKind,
    pub content: String,
}

/// A contiguous region of changes within a file, bounded by an `@@` header.
#[derive(Debug, Clone)]
pub struct Hunk {
    /// Starting line number in the old file
    pub old_start: usize,
    /// Number of lines covered in the old file
    pub old_count: usize,
    /// Starting line number in the new file
    pub new_start: usize,
    /// Number of lines covered in the new file
    pub new_count: usize,
    /// Trailing context text after the closing `@@` (usually the enclosing symbol)
    pub context: String,
    /// Lines of the hunk in source order
    pub changes: Vec<LineChange>,
}

/// A single file within a parsed diff. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Path on the "to" side of the diff (e.g., "src/api.py")
    pub file_path: String,
    /// Whether this file was created by the change
    pub is_new: bool,
    /// Whether this file was deleted by the change
    pub is_deleted: bool,
    /// Hunks in source order
    pub hunks: Vec<Hunk>,
    /// Added lines with their new-file line numbers
    pub added_lines: Vec<(usize, String)>,
    /// Removed lines with their old-file line numbers
    pub removed_lines: Vec<(usize, String)>,
}

impl FileDiff {
    /// File extension without the dot, lowercased. Empty for extensionless paths.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}
