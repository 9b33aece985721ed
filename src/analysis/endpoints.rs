//! Route-declaration extraction.
//!
//! Matches lines that pair an HTTP method token with a quoted path, e.g.
//! `@app.get("/users")`, `router.post("/items", handler)`, `#[get("/ping")]`,
//! and attributes the next function definition as the handler.

use super::symbols;
use super::types::{ChangeType, ChangedEndpoint};
use super::ExtractionError;
use crate::diff::FileDiff;

const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "head", "options"];

/// Extract endpoint changes for one file. A method+path present only on the
/// added side is Added, only on the removed side is Deleted, on both sides
/// is Modified.
pub fn extract(file: &FileDiff) -> Result<Vec<ChangedEndpoint>, ExtractionError> {
    let added = scan(&file.added_lines, file, true);
    let removed = scan(&file.removed_lines, file, false);

    let mut endpoints: Vec<ChangedEndpoint> = Vec::new();
    for mut ep in added {
        if removed
            .iter()
            .any(|r| r.method == ep.method && r.path == ep.path)
        {
            ep.change_type = ChangeType::Modified;
        }
        endpoints.push(ep);
    }
    for ep in removed {
        if !endpoints
            .iter()
            .any(|e| e.method == ep.method && e.path == ep.path)
        {
            endpoints.push(ep);
        }
    }
    Ok(endpoints)
}

fn scan(lines: &[(usize, String)], file: &FileDiff, added_side: bool) -> Vec<ChangedEndpoint> {
    let matcher = symbols::matcher_for(&file.extension());
    let mut found = Vec::new();
    for (idx, (_, text)) in lines.iter().enumerate() {
        let Some((method, path)) = match_route(text) else {
            continue;
        };
        // The handler is the next function definition within a few lines.
        let handler = lines
            .iter()
            .skip(idx + 1)
            .take(3)
            .find_map(|(_, l)| matcher.and_then(|m| m(l)))
            .map(|m| m.name);
        found.push(ChangedEndpoint {
            method,
            path,
            change_type: if added_side {
                ChangeType::Added
            } else {
                ChangeType::Deleted
            },
            file_path: file.file_path.clone(),
            handler,
        });
    }
    found
}

/// Match `<method>("<path>"` or `<method>('<path>'` anywhere in the line,
/// where the method token is preceded by `.`, `@`, `[` or line start.
fn match_route(line: &str) -> Option<(String, String)> {
    // ASCII lowercasing keeps byte offsets aligned with the original line.
    let lower: String = line.chars().map(|c| c.to_ascii_lowercase()).collect();
    for method in HTTP_METHODS {
        let mut search_from = 0;
        while let Some(rel) = lower[search_from..].find(method) {
            let pos = search_from + rel;
            search_from = pos + method.len();
            let boundary_ok = pos == 0
                || matches!(lower.as_bytes()[pos - 1], b'.' | b'@' | b'[' | b' ' | b'\t');
            if !boundary_ok {
                continue;
            }
            let after = &lower[pos + method.len()..];
            let Some(rest) = after.strip_prefix('(') else {
                continue;
            };
            let rest = rest.trim_start();
            let quote = match rest.chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => continue,
            };
            let body_start = line.len() - rest.len() + 1;
            let body = &line[body_start..];
            let Some(end) = body.find(quote) else { continue };
            let path = &body[..end];
            if !path.starts_with('/') {
                continue;
            }
            return Some((method.to_uppercase(), path.to_string()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;

    fn file_from_diff(text: &str) -> FileDiff {
        diff::parse(text).remove(0)
    }

    #[test]
    fn test_match_decorator_route() {
        let (method, path) = match_route("@app.get(\"/users/{id}\")").unwrap();
        assert_eq!(method, "GET");
        assert_eq!(path, "/users/{id}");
    }

    #[test]
    fn test_match_router_call() {
        let (method, path) = match_route("router.post('/items', create_item)").unwrap();
        assert_eq!(method, "POST");
        assert_eq!(path, "/items");
    }

    #[test]
    fn test_match_attribute_route() {
        let (method, path) = match_route("#[get(\"/ping\")]").unwrap();
        assert_eq!(method, "GET");
        assert_eq!(path, "/ping");
    }

    #[test]
    fn test_non_routes_do_not_match() {
        assert!(match_route("let target = widget.get(\"name\")").is_none());
        assert!(match_route("forget(\"/tmp/x\")").is_none());
        assert!(match_route("fn main() {}").is_none());
    }

    #[test]
    fn test_extract_added_endpoint_with_handler() {
        let file = file_from_diff(
            "diff --git a/app.py b/app.py\n--- a/app.py\n+++ b/app.py\n\
             @@ -1,0 +1,3 @@\n\
             +@app.post(\"/orders\")\n\
             +def create_order(payload):\n\
             +    return save(payload)\n",
        );
        let endpoints = extract(&file).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "POST");
        assert_eq!(endpoints[0].path, "/orders");
        assert_eq!(endpoints[0].change_type, ChangeType::Added);
        assert_eq!(endpoints[0].handler.as_deref(), Some("create_order"));
    }

    #[test]
    fn test_extract_modified_endpoint() {
        let file = file_from_diff(
            "diff --git a/app.py b/app.py\n--- a/app.py\n+++ b/app.py\n\
             @@ -1,1 +1,1 @@\n\
             -@app.get(\"/orders\")\n\
             +@app.get(\"/orders\")\n",
        );
        let endpoints = extract(&file).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].change_type, ChangeType::Modified);
    }

    #[test]
    fn test_extract_deleted_endpoint() {
        let file = file_from_diff(
            "diff --git a/app.py b/app.py\n--- a/app.py\n+++ b/app.py\n\
             @@ -1,1 +1,0 @@\n\
             -@app.delete(\"/orders/{id}\")\n",
        );
        let endpoints = extract(&file).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "DELETE");
        assert_eq!(endpoints[0].change_type, ChangeType::Deleted);
    }
}
