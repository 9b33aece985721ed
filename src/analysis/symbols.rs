//! Symbol extraction via per-language declaration matchers.
//!
//! Each supported language registers one matcher function that recognizes
//! declaration lines. New languages are added by registering a matcher in
//! `matcher_for`, not by branching the extractor.

use super::types::{ChangeType, ChangedSymbol, SymbolKind};
use super::ExtractionError;
use crate::diff::FileDiff;

/// A declaration recognized on a single line.
#[derive(Debug, Clone)]
pub struct SymbolMatch {
    pub name: String,
    pub kind: SymbolKind,
    pub is_public: bool,
}

/// One matcher per language, selected by file extension.
pub type Matcher = fn(&str) -> Option<SymbolMatch>;

/// Look up the declaration matcher for a file extension (lowercased,
/// without the dot). Returns None for languages we do not scan.
pub fn matcher_for(extension: &str) -> Option<Matcher> {
    match extension {
        "py" => Some(match_python),
        "rs" => Some(match_rust),
        "js" | "jsx" | "ts" | "tsx" | "mjs" => Some(match_javascript),
        "go" => Some(match_go),
        "java" => Some(match_java),
        _ => None,
    }
}

/// Extract added, modified, and deleted symbols for one file.
///
/// A name present only in added lines is Added; only in removed lines is
/// Deleted; in both is Modified (the added-side declaration wins). Spans are
/// single-line: end_line equals the declaration line.
pub fn extract(file: &FileDiff) -> Result<Vec<ChangedSymbol>, ExtractionError> {
    let matcher = match matcher_for(&file.extension()) {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };

    let mut added: Vec<(usize, usize, SymbolMatch, String)> = Vec::new();
    for (idx, (line_no, text)) in file.added_lines.iter().enumerate() {
        if let Some(m) = matcher(text) {
            added.push((idx, *line_no, m, text.trim().to_string()));
        }
    }

    let mut removed: Vec<(usize, SymbolMatch, String)> = Vec::new();
    for (line_no, text) in &file.removed_lines {
        if let Some(m) = matcher(text) {
            removed.push((*line_no, m, text.trim().to_string()));
        }
    }

    let mut symbols = Vec::new();
    for (idx, line_no, m, signature) in &added {
        let change_type = if removed.iter().any(|(_, r, _)| r.name == m.name) {
            ChangeType::Modified
        } else {
            ChangeType::Added
        };
        symbols.push(ChangedSymbol {
            name: m.name.clone(),
            kind: m.kind,
            change_type,
            file_path: file.file_path.clone(),
            start_line: *line_no,
            end_line: *line_no,
            signature: signature.clone(),
            docstring: docstring_near(file, *idx, *line_no),
            is_public: m.is_public,
        });
    }
    for (line_no, m, signature) in &removed {
        if added.iter().any(|(_, _, a, _)| a.name == m.name) {
            continue; // already emitted as Modified
        }
        symbols.push(ChangedSymbol {
            name: m.name.clone(),
            kind: m.kind,
            change_type: ChangeType::Deleted,
            file_path: file.file_path.clone(),
            start_line: *line_no,
            end_line: *line_no,
            signature: signature.clone(),
            docstring: None,
            is_public: m.is_public,
        });
    }
    Ok(symbols)
}

/// Find a docstring next to the declaration at added_lines[idx]:
/// either a string literal on the immediately following added line, or a
/// `///` doc comment on the immediately preceding added line.
fn docstring_near(file: &FileDiff, idx: usize, line_no: usize) -> Option<String> {
    if let Some((next_no, next)) = file.added_lines.get(idx + 1) {
        if *next_no == line_no + 1 {
            let trimmed = next.trim();
            for quote in ["\"\"\"", "'''", "\"", "'"] {
                if let Some(inner) = trimmed.strip_prefix(quote) {
                    let inner = inner.trim_end_matches(quote).trim();
                    if !inner.is_empty() {
                        return Some(inner.to_string());
                    }
                }
            }
        }
    }
    if idx > 0 {
        if let Some((prev_no, prev)) = file.added_lines.get(idx - 1) {
            if *prev_no + 1 == line_no {
                if let Some(doc) = prev.trim().strip_prefix("///") {
                    let doc = doc.trim();
                    if !doc.is_empty() {
                        return Some(doc.to_string());
                    }
                }
            }
        }
    }
    None
}

/// Leading identifier characters of `rest`.
fn take_ident(rest: &str) -> Option<String> {
    let name: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn match_python(line: &str) -> Option<SymbolMatch> {
    let indented = line.starts_with(' ') || line.starts_with('\t');
    let trimmed = line.trim_start();
    let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("def ") {
        let kind = if indented {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        (kind, rest)
    } else if let Some(rest) = trimmed.strip_prefix("async def ") {
        let kind = if indented {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        (kind, rest)
    } else if let Some(rest) = trimmed.strip_prefix("class ") {
        (SymbolKind::Class, rest)
    } else {
        return None;
    };
    let name = take_ident(rest)?;
    let is_public = !name.starts_with('_');
    Some(SymbolMatch {
        name,
        kind,
        is_public,
    })
}

fn match_rust(line: &str) -> Option<SymbolMatch> {
    let trimmed = line.trim_start();
    let is_public = trimmed.starts_with("pub ");
    let trimmed = trimmed.strip_prefix("pub ").unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_prefix("pub(crate) ")
        .unwrap_or(trimmed);
    let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("fn ") {
        (SymbolKind::Function, rest)
    } else if let Some(rest) = trimmed.strip_prefix("async fn ") {
        (SymbolKind::Function, rest)
    } else if let Some(rest) = trimmed.strip_prefix("struct ") {
        (SymbolKind::Struct, rest)
    } else if let Some(rest) = trimmed.strip_prefix("enum ") {
        (SymbolKind::Enum, rest)
    } else if let Some(rest) = trimmed.strip_prefix("trait ") {
        (SymbolKind::Interface, rest)
    } else if let Some(rest) = trimmed.strip_prefix("type ") {
        (SymbolKind::Type, rest)
    } else {
        return None;
    };
    let name = take_ident(rest)?;
    Some(SymbolMatch {
        name,
        kind,
        is_public,
    })
}

fn match_javascript(line: &str) -> Option<SymbolMatch> {
    let trimmed = line.trim_start();
    let exported = trimmed.starts_with("export ");
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("default ").unwrap_or(trimmed);
    let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("function ") {
        (SymbolKind::Function, rest)
    } else if let Some(rest) = trimmed.strip_prefix("async function ") {
        (SymbolKind::Function, rest)
    } else if let Some(rest) = trimmed.strip_prefix("class ") {
        (SymbolKind::Class, rest)
    } else if let Some(rest) = trimmed.strip_prefix("interface ") {
        (SymbolKind::Interface, rest)
    } else if let Some(rest) = trimmed.strip_prefix("type ") {
        if !rest.contains('=') {
            return None;
        }
        (SymbolKind::Type, rest)
    } else {
        return None;
    };
    let name = take_ident(rest)?;
    // Without module info, treat exported and top-level names as public
    // unless they carry the underscore convention.
    let is_public = exported || !name.starts_with('_');
    Some(SymbolMatch {
        name,
        kind,
        is_public,
    })
}

fn match_go(line: &str) -> Option<SymbolMatch> {
    let trimmed = line.trim_start();
    let (kind, rest) = if let Some(rest) = trimmed.strip_prefix("func ") {
        // Skip the receiver of a method: func (s *Server) Name(...)
        let rest = match rest.strip_prefix('(') {
            Some(after) => after.split_once(')').map(|(_, r)| r.trim_start())?,
            None => rest,
        };
        (SymbolKind::Function, rest)
    } else if let Some(rest) = trimmed.strip_prefix("type ") {
        let name = take_ident(rest)?;
        let after = rest[name.len()..].trim_start();
        let kind = if after.starts_with("interface") {
            SymbolKind::Interface
        } else if after.starts_with("struct") {
            SymbolKind::Struct
        } else {
            SymbolKind::Type
        };
        let is_public = name.chars().next().is_some_and(|c| c.is_uppercase());
        return Some(SymbolMatch {
            name,
            kind,
            is_public,
        });
    } else {
        return None;
    };
    let name = take_ident(rest)?;
    let is_public = name.chars().next().is_some_and(|c| c.is_uppercase());
    Some(SymbolMatch {
        name,
        kind,
        is_public,
    })
}

fn match_java(line: &str) -> Option<SymbolMatch> {
    let trimmed = line.trim_start();
    let is_public = trimmed.contains("public ");
    for (keyword, kind) in [
        ("class ", SymbolKind::Class),
        ("interface ", SymbolKind::Interface),
        ("enum ", SymbolKind::Enum),
    ] {
        if let Some(pos) = trimmed.find(keyword) {
            // Only accept the keyword at a word boundary near the modifiers
            let before = &trimmed[..pos];
            if before
                .split_whitespace()
                .all(|w| matches!(w, "public" | "private" | "protected" | "static" | "final" | "abstract"))
            {
                let name = take_ident(&trimmed[pos + keyword.len()..])?;
                return Some(SymbolMatch {
                    name,
                    kind,
                    is_public,
                });
            }
        }
    }
    None
}
