//! Breaking-change detection.
//!
//! Three independent signals:
//! - an explicit breaking-change marker anywhere in the file's hunks,
//! - a removed public symbol with no same-named added symbol,
//! - a retained symbol whose parameter list changed, ignoring parameters
//!   that carry a default value.

use super::symbols;
use super::types::{ChangeType, ChangedSymbol};
use super::ExtractionError;
use crate::diff::FileDiff;

const MARKERS: &[&str] = &["breaking change", "breaking-change", "breaking:"];

pub fn detect(
    file: &FileDiff,
    symbols: &[ChangedSymbol],
) -> Result<Vec<String>, ExtractionError> {
    let mut findings = Vec::new();

    for hunk in &file.hunks {
        for change in &hunk.changes {
            let lower = change.content.to_lowercase();
            if MARKERS.iter().any(|m| lower.contains(m)) {
                findings.push(format!(
                    "Explicit breaking-change marker in {}: {}",
                    file.file_path,
                    change.content.trim()
                ));
            }
        }
    }

    for symbol in symbols {
        if symbol.change_type == ChangeType::Deleted && symbol.is_public {
            findings.push(format!(
                "Public {} `{}` was removed from {}",
                symbol.kind, symbol.name, file.file_path
            ));
        }
    }

    // Signature comparison needs the removed-side declaration; re-scan the
    // removed lines so this signal stays independent of the symbol extractor.
    if let Some(matcher) = symbols::matcher_for(&file.extension()) {
        for symbol in symbols {
            if symbol.change_type != ChangeType::Modified {
                continue;
            }
            let old_signature = file
                .removed_lines
                .iter()
                .find(|(_, text)| matcher(text).is_some_and(|m| m.name == symbol.name))
                .map(|(_, text)| text.trim().to_string());
            if let Some(old_signature) = old_signature {
                let old_params = required_params(&old_signature);
                let new_params = required_params(&symbol.signature);
                if old_params != new_params {
                    findings.push(format!(
                        "Signature of `{}` changed in {}: ({}) -> ({})",
                        symbol.name,
                        file.file_path,
                        old_params.join(", "),
                        new_params.join(", ")
                    ));
                }
            }
        }
    }

    Ok(findings)
}

/// Parameter names between the first parenthesis pair, dropping any
/// parameter that carries a default value (`name=...`).
fn required_params(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let rest = &signature[open + 1..];
    let Some(close) = rest.find(')') else {
        return Vec::new();
    };
    rest[..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.contains('='))
        .map(|p| p.to_string())
        .collect()
}
