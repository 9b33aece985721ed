//! Confidence scoring.
//!
//! Adjustments are an explicit, ordered list of named delta functions so the
//! score stays reproducible and each heuristic can be tested in isolation.

use super::types::TaskType;
use crate::analysis::{ChangeType, StructuredChange};

pub struct Adjustment {
    pub name: &'static str,
    pub delta: fn(&StructuredChange) -> f32,
}

pub static ADJUSTMENTS: &[Adjustment] = &[
    Adjustment {
        name: "documented-symbols",
        delta: documented_symbols_bonus,
    },
    Adjustment {
        name: "breadth",
        delta: breadth_bonus,
    },
];

/// Apply all adjustments to the rule's base confidence, then the
/// breaking-change floor, then clamp into [0, 1].
pub fn score(task_type: TaskType, base: f32, change: &StructuredChange) -> f32 {
    let mut confidence = base;
    for adjustment in ADJUSTMENTS {
        confidence += (adjustment.delta)(change);
    }
    if task_type == TaskType::UpgradeGuide {
        confidence = confidence.max(0.9);
    }
    confidence.clamp(0.0, 1.0)
}

/// +0.1 when every new or changed public symbol carries a docstring.
/// Requires at least one such symbol so docstring-free changes elsewhere in
/// the file never pick up the bonus.
fn documented_symbols_bonus(change: &StructuredChange) -> f32 {
    let mut relevant = change
        .symbols
        .iter()
        .filter(|s| s.is_public && s.change_type != ChangeType::Deleted)
        .peekable();
    if relevant.peek().is_none() {
        return 0.0;
    }
    if relevant.all(|s| s.docstring.as_deref().is_some_and(|d| !d.is_empty())) {
        0.1
    } else {
        0.0
    }
}

/// +0.05 per affected symbol/endpoint beyond the first, capped at +0.2.
fn breadth_bonus(change: &StructuredChange) -> f32 {
    let affected = change.symbols.len() + change.endpoints.len();
    let extra = affected.saturating_sub(1) as f32 * 0.05;
    extra.min(0.2)
}
