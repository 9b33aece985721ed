//! Migration extraction.
//!
//! Triggers only for files under a `migrations` path segment whose file name
//! carries a numeric version prefix (e.g., `migrations/0042_add_index.sql`).
//! Added lines are scanned for DDL-like operation keywords.

use super::types::{ChangeType, MigrationChange};
use super::ExtractionError;
use crate::diff::FileDiff;

/// (keyword to look for in uppercased text, canonical operation name)
const DDL_OPERATIONS: &[(&str, &str)] = &[
    ("CREATE TABLE", "create_table"),
    ("DROP TABLE", "drop_table"),
    ("ALTER TABLE", "alter_table"),
    ("ADD COLUMN", "add_column"),
    ("DROP COLUMN", "drop_column"),
    ("RENAME COLUMN", "rename_column"),
    ("CREATE INDEX", "create_index"),
    ("CREATE UNIQUE INDEX", "create_index"),
    ("DROP INDEX", "drop_index"),
];

pub fn extract(file: &FileDiff) -> Result<Vec<MigrationChange>, ExtractionError> {
    let path = std::path::Path::new(&file.file_path);
    let in_migrations_dir = path
        .components()
        .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case("migrations"));
    if !in_migrations_dir {
        return Ok(Vec::new());
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let version: String = stem.chars().take_while(|c| c.is_ascii_digit()).collect();
    if version.is_empty() {
        return Ok(Vec::new());
    }
    if version.parse::<u64>().is_err() {
        return Err(ExtractionError {
            extractor: "migration",
            file: file.file_path.clone(),
            reason: format!("unparsable version prefix `{}`", version),
        });
    }

    let description = stem[version.len()..]
        .trim_matches(|c| c == '_' || c == '-')
        .replace(['_', '-'], " ");

    let mut operations = Vec::new();
    let mut tables_affected = Vec::new();
    for (_, text) in &file.added_lines {
        // ASCII uppercasing keeps byte offsets aligned with the original line.
        let upper: String = text.chars().map(|c| c.to_ascii_uppercase()).collect();
        for (keyword, op) in DDL_OPERATIONS {
            let Some(pos) = upper.find(keyword) else {
                continue;
            };
            if !operations.contains(&op.to_string()) {
                operations.push(op.to_string());
            }
            if keyword.ends_with("TABLE") {
                if let Some(table) = table_name_after(&text[pos + keyword.len()..]) {
                    if !tables_affected.contains(&table) {
                        tables_affected.push(table);
                    }
                }
            }
        }
    }

    let change_type = if file.is_new {
        ChangeType::Added
    } else if file.is_deleted {
        ChangeType::Deleted
    } else {
        ChangeType::Modified
    };

    Ok(vec![MigrationChange {
        version,
        description,
        file_path: file.file_path.clone(),
        change_type,
        tables_affected,
        operations,
    }])
}

/// First identifier after a TABLE keyword, skipping `IF [NOT] EXISTS` and quoting.
fn table_name_after(rest: &str) -> Option<String> {
    let mut words = rest.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        if word.eq_ignore_ascii_case("if")
            || word.eq_ignore_ascii_case("not")
            || word.eq_ignore_ascii_case("exists")
        {
            words.next();
        } else {
            break;
        }
    }
    let raw = words.next()?;
    let name: String = raw
        .trim_matches(|c| c == '"' || c == '`' || c == '\'' || c == '(' || c == ';')
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;

    fn file_from_diff(text: &str) -> FileDiff {
        diff::parse(text).remove(0)
    }

    #[test]
    fn test_sql_migration() {
        let file = file_from_diff(
            "diff --git a/db/migrations/0042_add_orders.sql b/db/migrations/0042_add_orders.sql\n\
             --- /dev/null\n+++ b/db/migrations/0042_add_orders.sql\n\
             @@ -0,0 +1,3 @@\n\
             +CREATE TABLE IF NOT EXISTS orders (\n\
             +    id BIGINT PRIMARY KEY\n\
             +);\n",
        );
        let migrations = extract(&file).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, "0042");
        assert_eq!(migrations[0].description, "add orders");
        assert_eq!(migrations[0].change_type, ChangeType::Added);
        assert_eq!(migrations[0].operations, vec!["create_table"]);
        assert_eq!(migrations[0].tables_affected, vec!["orders"]);
    }

    #[test]
    fn test_alter_and_index_operations() {
        let file = file_from_diff(
            "diff --git a/migrations/7_widen.sql b/migrations/7_widen.sql\n\
             --- a/migrations/7_widen.sql\n+++ b/migrations/7_widen.sql\n\
             @@ -1,0 +1,2 @@\n\
             +ALTER TABLE users ADD COLUMN nickname TEXT;\n\
             +CREATE INDEX idx_users_nickname ON users (nickname);\n",
        );
        let migrations = extract(&file).unwrap();
        let m = &migrations[0];
        assert!(m.operations.contains(&"alter_table".to_string()));
        assert!(m.operations.contains(&"add_column".to_string()));
        assert!(m.operations.contains(&"create_index".to_string()));
        assert_eq!(m.tables_affected, vec!["users"]);
    }

    #[test]
    fn test_non_migration_paths_are_ignored() {
        let file = file_from_diff(
            "diff --git a/src/0042_not_a_migration.sql b/src/0042_not_a_migration.sql\n\
             --- a/src/0042_not_a_migration.sql\n+++ b/src/0042_not_a_migration.sql\n\
             @@ -1,0 +1,1 @@\n+CREATE TABLE x (id INT);\n",
        );
        assert!(extract(&file).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_version_prefix_is_an_extraction_error() {
        let file = file_from_diff(
            "diff --git a/migrations/99999999999999999999999_x.sql b/migrations/99999999999999999999999_x.sql\n\
             --- /dev/null\n+++ b/migrations/99999999999999999999999_x.sql\n\
             @@ -0,0 +1,1 @@\n+CREATE TABLE x (id INT);\n",
        );
        let err = extract(&file).unwrap_err();
        assert_eq!(err.extractor, "migration");
    }

    #[test]
    fn test_migration_without_numeric_prefix_is_ignored() {
        let file = file_from_diff(
            "diff --git a/migrations/env.py b/migrations/env.py\n\
             --- a/migrations/env.py\n+++ b/migrations/env.py\n\
             @@ -1,0 +1,1 @@\n+run_migrations_online()\n",
        );
        assert!(extract(&file).unwrap().is_empty());
    }
}
