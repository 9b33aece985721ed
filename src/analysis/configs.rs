//! Config-key extraction.
//!
//! Matches top-level `KEY = value` assignments where the key is
//! UPPER_SNAKE_CASE and the line carries no indentation. A key present in
//! both removed and added lines becomes one Modified entry carrying the old
//! and new values.

use super::types::{ChangeType, ConfigChange};
use super::ExtractionError;
use crate::diff::FileDiff;

pub fn extract(file: &FileDiff) -> Result<Vec<ConfigChange>, ExtractionError> {
    let added = scan(&file.added_lines);
    let removed = scan(&file.removed_lines);

    let mut changes = Vec::new();
    for (key, new_value) in &added {
        match removed.iter().find(|(k, _)| k == key) {
            Some((_, old_value)) => changes.push(ConfigChange {
                key: key.clone(),
                old_value: Some(old_value.clone()),
                new_value: Some(new_value.clone()),
                file_path: file.file_path.clone(),
                change_type: ChangeType::Modified,
            }),
            None => changes.push(ConfigChange {
                key: key.clone(),
                old_value: None,
                new_value: Some(new_value.clone()),
                file_path: file.file_path.clone(),
                change_type: ChangeType::Added,
            }),
        }
    }
    for (key, old_value) in &removed {
        if added.iter().any(|(k, _)| k == key) {
            continue;
        }
        changes.push(ConfigChange {
            key: key.clone(),
            old_value: Some(old_value.clone()),
            new_value: None,
            file_path: file.file_path.clone(),
            change_type: ChangeType::Deleted,
        });
    }
    Ok(changes)
}

fn scan(lines: &[(usize, String)]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (_, text) in lines {
        if let Some((key, value)) = match_assignment(text) {
            if !pairs.iter().any(|(k, _)| *k == key) {
                pairs.push((key, value));
            }
        }
    }
    pairs
}

fn match_assignment(line: &str) -> Option<(String, String)> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        || !key.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    {
        return None;
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}
