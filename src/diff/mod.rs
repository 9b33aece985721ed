pub mod types;

pub use types::{ChangeKind, FileDiff, Hunk, LineChange};

use tracing::warn;

/// Parse a unified diff string into a vector of FileDiff structs.
///
/// The input is standard `git diff` output:
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// New files have: `--- /dev/null`
/// Deleted files have: `+++ /dev/null`
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
/// (counts default to 1 when omitted)
///
/// Lines are prefixed with:
///   '+' for additions
///   '-' for deletions
///   ' ' for context (unchanged)
///
/// Parsing never fails: malformed hunk headers and hunks that appear before
/// any file header are dropped with a warning, and the rest of the diff is
/// still returned.
pub fn parse(diff_text: &str) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut current_file: Option<FileDiff> = None;
    let mut current_hunk: Option<Hunk> = None;
    // Running line counters inside the current hunk
    let mut old_line = 0usize;
    let mut new_line = 0usize;

    let finish_hunk = |file: &mut Option<FileDiff>, hunk: &mut Option<Hunk>| {
        if let (Some(file), Some(hunk)) = (file.as_mut(), hunk.take()) {
            file.hunks.push(hunk);
        }
    };

    let finish_file =
        |files: &mut Vec<FileDiff>, file: &mut Option<FileDiff>, hunk: &mut Option<Hunk>| {
            finish_hunk(file, hunk);
            if let Some(file) = file.take() {
                files.push(file);
            }
        };

    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_file(&mut files, &mut current_file, &mut current_hunk);
            let mut parts = rest.split_whitespace();
            let a_path = parts.next().unwrap_or("");
            let b_path = parts.next().unwrap_or(a_path);
            let path = b_path
                .strip_prefix("b/")
                .or_else(|| a_path.strip_prefix("a/"))
                .unwrap_or(b_path);
            if path.is_empty() {
                warn!(line, "skipping diff header with no path");
                continue;
            }
            current_file = Some(FileDiff {
                file_path: path.to_string(),
                is_new: false,
                is_deleted: false,
                hunks: Vec::new(),
                added_lines: Vec::new(),
                removed_lines: Vec::new(),
            });
            continue;
        }

        if line.starts_with("@@") {
            finish_hunk(&mut current_file, &mut current_hunk);
            if current_file.is_none() {
                warn!(line, "dropping hunk outside of any file section");
                continue;
            }
            match parse_hunk_header(line) {
                Some(hunk) => {
                    old_line = hunk.old_start;
                    new_line = hunk.new_start;
                    current_hunk = Some(hunk);
                }
                None => {
                    warn!(line, "dropping malformed hunk header");
                }
            }
            continue;
        }

        if line.starts_with("--- ") || line.starts_with("+++ ") {
            if let Some(file) = current_file.as_mut() {
                let path = line[4..].trim();
                if line.starts_with("--- ") && path == "/dev/null" {
                    file.is_new = true;
                }
                if line.starts_with("+++ ") && path == "/dev/null" {
                    file.is_deleted = true;
                }
            }
            continue;
        }

        if let (Some(file), Some(hunk)) = (current_file.as_mut(), current_hunk.as_mut()) {
            if line.starts_with('+') && !line.starts_with("+++") {
                let content = line[1..].to_string();
                file.added_lines.push((new_line, content.clone()));
                hunk.changes.push(LineChange {
                    kind: ChangeKind::Add,
                    content,
                });
                new_line += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                let content = line[1..].to_string();
                file.removed_lines.push((old_line, content.clone()));
                hunk.changes.push(LineChange {
                    kind: ChangeKind::Delete,
                    content,
                });
                old_line += 1;
            } else if let Some(content) = line.strip_prefix(' ') {
                hunk.changes.push(LineChange {
                    kind: ChangeKind::Context,
                    content: content.to_string(),
                });
                old_line += 1;
                new_line += 1;
            }
        }
    }

    finish_file(&mut files, &mut current_file, &mut current_hunk);
    files
}

/// Parse `@@ -{old_start},{old_count} +{new_start},{new_count} @@{context}`.
/// Returns None on any malformed component so the caller can drop the hunk.
fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.strip_prefix("@@")?.trim_start();
    let (ranges, context) = match rest.find("@@") {
        Some(pos) => (rest[..pos].trim(), rest[pos + 2..].trim().to_string()),
        None => (rest.trim(), String::new()),
    };
    let mut parts = ranges.split_whitespace();
    let (old_start, old_count) = parse_range(parts.next()?, '-')?;
    let (new_start, new_count) = parse_range(parts.next()?, '+')?;
    Some(Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        context,
        changes: Vec::new(),
    })
}

fn parse_range(part: &str, prefix: char) -> Option<(usize, usize)> {
    let range = part.strip_prefix(prefix)?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    let start = start_str.parse::<usize>().ok()?;
    let count = count_str.parse::<usize>().ok()?;
    Some((start, count))
}
