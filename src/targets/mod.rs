pub mod framework;

pub use framework::DocFramework;

use std::collections::BTreeMap;
use std::path::Path;

use crate::planner::DocumentationTask;
use crate::semantic::{DocumentStore, EmbeddingClient};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A documentation file a task should touch. Ephemeral, produced per task.
#[derive(Debug, Clone)]
pub struct TargetFile {
    /// Path relative to the repository root
    pub path: String,
    pub framework: DocFramework,
    pub confidence: f32,
    pub reason: String,
    /// Heading of the best-matching section, when known
    pub section: Option<String>,
    pub create_if_missing: bool,
    pub metadata: BTreeMap<String, String>,
}

/// An entry to insert into the framework's navigation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavEntry {
    pub section: String,
    pub title: String,
    pub path: String,
}

/// Decides which existing or new documentation file(s) a task should touch.
///
/// Semantic matching runs when both collaborators are available; any
/// collaborator failure degrades selection to convention matching instead
/// of aborting the task.
pub struct TargetFileSelector<'a> {
    embeddings: Option<&'a dyn EmbeddingClient>,
    store: Option<&'a dyn DocumentStore>,
    similarity_threshold: f32,
    duplicate_threshold: f32,
}

impl<'a> TargetFileSelector<'a> {
    pub fn new(
        embeddings: Option<&'a dyn EmbeddingClient>,
        store: Option<&'a dyn DocumentStore>,
    ) -> Self {
        Self {
            embeddings,
            store,
            similarity_threshold: 0.5,
            duplicate_threshold: 0.9,
        }
    }

    pub fn with_thresholds(mut self, similarity: f32, duplicate: f32) -> Self {
        self.similarity_threshold = similarity;
        self.duplicate_threshold = duplicate;
        self
    }

    /// Select up to `max_files` targets for one task.
    pub async fn select(
        &self,
        task: &DocumentationTask,
        repo_root: &Path,
        max_files: usize,
    ) -> Vec<TargetFile> {
        let framework = DocFramework::detect(repo_root);
        let repo = repo_root.to_string_lossy().to_string();
        debug!(%framework, task = %task.title, "selecting target files");

        let semantic = self.semantic_pass(task, &repo, framework).await;
        let semantic_paths: Vec<String> = semantic.iter().map(|t| t.path.clone()).collect();
        let convention = self.convention_pass(task, repo_root, framework);

        // Merge: a path appearing in both passes keeps the higher confidence.
        let mut merged: Vec<TargetFile> = semantic;
        for candidate in convention {
            match merged.iter_mut().find(|t| t.path == candidate.path) {
                Some(existing) => {
                    if candidate.confidence > existing.confidence {
                        let section = existing.section.take();
                        *existing = candidate;
                        if existing.section.is_none() {
                            existing.section = section;
                        }
                    }
                }
                None => merged.push(candidate),
            }
        }
        merged.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        merged.truncate(max_files);

        let mut targets = self
            .filter_duplicates(merged, task, &repo, repo_root, &semantic_paths)
            .await;

        if let Some(nav) = self.navigation_target(task, framework, &targets) {
            targets.push(nav);
        }
        targets
    }

    /// Embed the task text and group store hits by file.
    async fn semantic_pass(
        &self,
        task: &DocumentationTask,
        repo: &str,
        framework: DocFramework,
    ) -> Vec<TargetFile> {
        let (Some(embeddings), Some(store)) = (self.embeddings, self.store) else {
            return Vec::new();
        };
        let query = format!("{}\n{}", task.title, task.description);
        let vector = match embeddings.embed(&query).await {
            Ok(v) => v,
            Err(err) => {
                warn!(%err, "embedding failed, falling back to convention matching");
                return Vec::new();
            }
        };
        let hits = match store
            .search_similar(&vector, repo, 20, self.similarity_threshold)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!(%err, "document store query failed, falling back to convention matching");
                return Vec::new();
            }
        };

        // Group by file: confidence is the mean similarity of the file's
        // hits, section the heading of its single best hit.
        let mut by_path: BTreeMap<String, (f32, usize, f32, String)> = BTreeMap::new();
        for hit in hits {
            let entry = by_path
                .entry(hit.path.clone())
                .or_insert((0.0, 0, f32::MIN, String::new()));
            entry.0 += hit.similarity;
            entry.1 += 1;
            if hit.similarity > entry.2 {
                entry.2 = hit.similarity;
                entry.3 = hit.heading.clone();
            }
        }

        by_path
            .into_iter()
            .map(|(path, (sum, count, _, heading))| TargetFile {
                path,
                framework,
                confidence: sum / count as f32,
                reason: format!("semantic match across {} section(s)", count),
                section: if heading.is_empty() {
                    None
                } else {
                    Some(heading)
                },
                create_if_missing: false,
                metadata: BTreeMap::new(),
            })
            .collect()
    }

    /// Suggested files plus the task type's canonical file under the docs
    /// root, at fixed confidence below semantic matches.
    fn convention_pass(
        &self,
        task: &DocumentationTask,
        repo_root: &Path,
        framework: DocFramework,
    ) -> Vec<TargetFile> {
        let docs_root = framework.docs_root(repo_root);
        let canonical = task.task_type.canonical_file();
        let canonical_path = if canonical == "CHANGELOG.md" {
            canonical.to_string()
        } else {
            docs_root.join(canonical).to_string_lossy().to_string()
        };

        let mut candidates = task.suggested_files.clone();
        if !candidates.contains(&canonical_path) {
            candidates.push(canonical_path);
        }

        let mut targets = Vec::new();
        for path in candidates {
            if targets.iter().any(|t: &TargetFile| t.path == path) {
                continue;
            }
            let exists = repo_root.join(&path).is_file();
            targets.push(TargetFile {
                path,
                framework,
                confidence: if exists { 0.6 } else { 0.5 },
                reason: if exists {
                    "convention match (existing file)".to_string()
                } else {
                    "convention match (new file)".to_string()
                },
                section: None,
                create_if_missing: !exists,
                metadata: BTreeMap::new(),
            });
        }
        targets
    }

    /// Drop targets whose existing content already covers the task, unless
    /// the file itself produced a semantic match (a legitimate update).
    async fn filter_duplicates(
        &self,
        targets: Vec<TargetFile>,
        task: &DocumentationTask,
        repo: &str,
        repo_root: &Path,
        semantic_paths: &[String],
    ) -> Vec<TargetFile> {
        let Some(store) = self.store else {
            return targets;
        };
        let mut kept = Vec::new();
        for target in targets {
            if semantic_paths.contains(&target.path) || !repo_root.join(&target.path).is_file() {
                kept.push(target);
                continue;
            }
            let chunks = match store.get_chunks(repo, &target.path).await {
                Ok(chunks) => chunks,
                Err(err) => {
                    warn!(%err, path = %target.path, "chunk fetch failed, keeping target");
                    kept.push(target);
                    continue;
                }
            };
            let overlap = chunks
                .iter()
                .map(|c| keyword_overlap(&c.content, &task.description))
                .fold(0.0f32, f32::max);
            if overlap > self.duplicate_threshold {
                info!(path = %target.path, overlap, "dropping target: content already covered");
            } else {
                kept.push(target);
            }
        }
        kept
    }

    /// Synthetic target for the framework's navigation file when any
    /// surviving target creates a new page. Never content-replaced, only
    /// structurally edited by `apply_navigation_update`.
    fn navigation_target(
        &self,
        task: &DocumentationTask,
        framework: DocFramework,
        targets: &[TargetFile],
    ) -> Option<TargetFile> {
        let nav_file = framework.nav_file()?;
        let entries: Vec<NavEntry> = targets
            .iter()
            .filter(|t| t.create_if_missing)
            .map(|t| NavEntry {
                section: task.target_section.to_string(),
                title: task.title.clone(),
                path: t.path.clone(),
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        let mut metadata = BTreeMap::new();
        let encoded = serde_json::to_string(&entries).unwrap_or_default();
        metadata.insert("new_entries".to_string(), encoded);
        Some(TargetFile {
            path: nav_file.to_string(),
            framework,
            confidence: 1.0,
            reason: "navigation update for newly created page(s)".to_string(),
            section: None,
            create_if_missing: false,
            metadata,
        })
    }
}

/// Jaccard overlap of the significant words in two texts.
fn keyword_overlap(a: &str, b: &str) -> f32 {
    let words = |text: &str| -> std::collections::BTreeSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 3)
            .map(|w| w.to_string())
            .collect()
    };
    let set_a = words(a);
    let set_b = words(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f32;
    let union = set_a.union(&set_b).count() as f32;
    intersection / union
}

/// Structurally edit a navigation file with the target's `new_entries`.
/// mkdocs.yml gets real `nav:` entries; other formats get commented
/// placeholders so a human can slot them in.
pub fn apply_navigation_update(content: &str, target: &TargetFile) -> String {
    let Some(encoded) = target.metadata.get("new_entries") else {
        return content.to_string();
    };
    let entries: Vec<NavEntry> = match serde_json::from_str(encoded) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%err, "unreadable new_entries metadata, leaving navigation untouched");
            return content.to_string();
        }
    };

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    if target.path == "mkdocs.yml" {
        if !content.lines().any(|l| l.trim_end() == "nav:") {
            out.push_str("nav:\n");
        }
        for entry in &entries {
            // mkdocs nav paths are relative to the docs directory
            let page = entry.path.strip_prefix("docs/").unwrap_or(&entry.path);
            out.push_str(&format!("  - {}: {}\n", entry.title, page));
        }
    } else {
        for entry in &entries {
            out.push_str(&format!("# docsmith: add `{}` ({})\n", entry.path, entry.title));
        }
    }
    out
}
