/// Kind of declared symbol recognized by the language matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    Interface,
    Type,
    Struct,
    Enum,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
        };
        write!(f, "{}", name)
    }
}

/// Direction of a change for a symbol, endpoint, config key, or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// A declaration the diff added, modified, or removed.
#[derive(Debug, Clone)]
pub struct ChangedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub change_type: ChangeType,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Full declaration line, trimmed
    pub signature: String,
    pub docstring: Option<String>,
    /// Derived: name carries no leading underscore / private marker
    pub is_public: bool,
}

/// A route declaration the diff touched.
#[derive(Debug, Clone)]
pub struct ChangedEndpoint {
    /// HTTP method, uppercased (e.g., "GET")
    pub method: String,
    pub path: String,
    pub change_type: ChangeType,
    pub file_path: String,
    /// Name of the handler function defined right after the route, if found
    pub handler: Option<String>,
}

/// A top-level `KEY = value` assignment the diff touched.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub file_path: String,
    pub change_type: ChangeType,
}

/// A schema migration file the diff touched.
#[derive(Debug, Clone)]
pub struct MigrationChange {
    /// Numeric version prefix of the migration file name
    pub version: String,
    /// Human-readable description derived from the file name
    pub description: String,
    pub file_path: String,
    pub change_type: ChangeType,
    pub tables_affected: Vec<String>,
    pub operations: Vec<String>,
}

/// How a file's change is classified. Assigned by a single deterministic
/// rule; the first matching category in declaration order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeCategory {
    BreakingChange,
    ApiChange,
    ConfigChange,
    Migration,
    NewFeature,
    BugFix,
    Refactor,
    Other,
}

impl ChangeCategory {
    /// Fixed per-category base used by the impact score.
    pub fn weight(&self) -> f32 {
        match self {
            ChangeCategory::BreakingChange => 0.85,
            ChangeCategory::ApiChange => 0.6,
            ChangeCategory::Migration => 0.6,
            ChangeCategory::NewFeature => 0.45,
            ChangeCategory::ConfigChange => 0.4,
            ChangeCategory::BugFix => 0.3,
            ChangeCategory::Refactor => 0.2,
            ChangeCategory::Other => 0.1,
        }
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChangeCategory::BreakingChange => "BREAKING_CHANGE",
            ChangeCategory::ApiChange => "API_CHANGE",
            ChangeCategory::ConfigChange => "CONFIG_CHANGE",
            ChangeCategory::Migration => "MIGRATION",
            ChangeCategory::NewFeature => "NEW_FEATURE",
            ChangeCategory::BugFix => "BUG_FIX",
            ChangeCategory::Refactor => "REFACTOR",
            ChangeCategory::Other => "OTHER",
        };
        write!(f, "{}", name)
    }
}

/// The analyzer's normalized, per-file summary of what changed and why it
/// matters. One StructuredChange per changed file per diff.
#[derive(Debug, Clone)]
pub struct StructuredChange {
    pub file_path: String,
    pub change_type: ChangeType,
    pub category: ChangeCategory,
    pub symbols: Vec<ChangedSymbol>,
    pub endpoints: Vec<ChangedEndpoint>,
    pub configs: Vec<ConfigChange>,
    pub migrations: Vec<MigrationChange>,
    pub breaking_changes: Vec<String>,
    pub new_features: Vec<String>,
    /// Estimate (0-1) of how significant this file's change is
    pub impact_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_weights_are_probabilities() {
        let all = [
            ChangeCategory::BreakingChange,
            ChangeCategory::ApiChange,
            ChangeCategory::ConfigChange,
            ChangeCategory::Migration,
            ChangeCategory::NewFeature,
            ChangeCategory::BugFix,
            ChangeCategory::Refactor,
            ChangeCategory::Other,
        ];
        for category in all {
            let w = category.weight();
            assert!((0.0..=1.0).contains(&w), "{} weight {}", category, w);
        }
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ChangeCategory::BreakingChange.to_string(), "BREAKING_CHANGE");
        assert_eq!(ChangeCategory::NewFeature.to_string(), "NEW_FEATURE");
    }
}
