//! Embedding and document-store collaborators.
//!
//! Both are trait seams so the selector can run against a live embedding
//! API and an in-memory chunk store, or against test fakes. Any failure
//! here degrades target selection to convention-only matching; it never
//! aborts a task.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding response contained no vectors")]
    EmptyResponse,

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Produces a fixed-dimension vector for a piece of text.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;
}

/// A similarity hit inside a documentation file.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub path: String,
    pub heading: String,
    pub similarity: f32,
}

/// A stored section of a documentation file.
#[derive(Debug, Clone)]
pub struct DocChunk {
    pub heading: String,
    pub content: String,
}

/// Lookup side of the documentation chunk index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Chunks within `repo` whose similarity to `vector` meets `threshold`,
    /// best first, at most `limit`.
    async fn search_similar(
        &self,
        vector: &[f32],
        repo: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkHit>, SemanticError>;

    /// All stored chunks of one file.
    async fn get_chunks(&self, repo: &str, path: &str) -> Result<Vec<DocChunk>, SemanticError>;
}

/// Embedding client for an OpenAI-style `/embeddings` endpoint.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpEmbeddingClient {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(serde::Deserialize)]
        struct Data {
            embedding: Vec<f32>,
        }

        #[derive(serde::Deserialize)]
        struct Response {
            data: Vec<Data>,
        }

        debug!("requesting embedding");
        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&Request {
                model: &self.model,
                input: text,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(SemanticError::EmptyResponse)
    }
}

struct StoredChunk {
    repo: String,
    path: String,
    heading: String,
    content: String,
    embedding: Vec<f32>,
}

/// Process-local chunk index. Populated by `index_docs` (or directly in
/// tests) and queried by the target-file selector. Append/lookup only.
pub struct InMemoryDocumentStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn add_chunk(
        &self,
        repo: &str,
        path: &str,
        heading: &str,
        content: &str,
        embedding: Vec<f32>,
    ) {
        // Poisoning only interrupts the push of one chunk; the stored data
        // is intact, so recover the lock instead of panicking.
        let mut chunks = self.chunks.write().unwrap_or_else(|e| e.into_inner());
        chunks.push(StoredChunk {
            repo: repo.to_string(),
            path: path.to_string(),
            heading: heading.to_string(),
            content: content.to_string(),
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.chunks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn search_similar(
        &self,
        vector: &[f32],
        repo: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkHit>, SemanticError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|_| SemanticError::StoreUnavailable("chunk store lock poisoned".to_string()))?;
        let mut hits: Vec<ChunkHit> = chunks
            .iter()
            .filter(|c| c.repo == repo)
            .map(|c| ChunkHit {
                path: c.path.clone(),
                heading: c.heading.clone(),
                similarity: cosine_similarity(vector, &c.embedding),
            })
            .filter(|h| h.similarity >= threshold)
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_chunks(&self, repo: &str, path: &str) -> Result<Vec<DocChunk>, SemanticError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|_| SemanticError::StoreUnavailable("chunk store lock poisoned".to_string()))?;
        Ok(chunks
            .iter()
            .filter(|c| c.repo == repo && c.path == path)
            .map(|c| DocChunk {
                heading: c.heading.clone(),
                content: c.content.clone(),
            })
            .collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Walk the docs root, split every markdown file into heading-bounded
/// sections, embed each section, and add it to the store. Returns the
/// number of chunks indexed.
pub async fn index_docs(
    store: &InMemoryDocumentStore,
    embeddings: &dyn EmbeddingClient,
    repo: &str,
    repo_root: &Path,
    docs_root: &Path,
) -> Result<usize, SemanticError> {
    let mut files = Vec::new();
    collect_markdown(docs_root, &mut files);
    files.sort();

    let mut indexed = 0;
    for file in files {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .to_string();
        for (heading, body) in split_sections(&content) {
            let text = format!("{}\n{}", heading, body);
            let vector = embeddings.embed(&text).await?;
            store.add_chunk(repo, &rel, &heading, &body, vector);
            indexed += 1;
        }
    }
    debug!(indexed, "indexed documentation chunks");
    Ok(indexed)
}

fn collect_markdown(dir: &Path, out: &mut Vec<std::path::PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(&path, out);
        } else if path.extension().is_some_and(|e| e == "md") {
            out.push(path);
        }
    }
}

/// Split markdown into (heading, body) sections. Text before the first
/// heading gets an empty heading.
pub fn split_sections(content: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut heading = String::new();
    let mut body = String::new();
    for line in content.lines() {
        if line.starts_with('#') {
            if !body.trim().is_empty() || !heading.is_empty() {
                sections.push((heading.clone(), body.trim().to_string()));
            }
            heading = line.trim_start_matches('#').trim().to_string();
            body.clear();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    if !body.trim().is_empty() || !heading.is_empty() {
        sections.push((heading, body.trim().to_string()));
    }
    sections
}

/// Deterministic test double: hashes word presence into a small vector.
/// Texts sharing vocabulary get high cosine similarity.
pub struct FakeEmbeddingClient {
    dimension: usize,
}

impl FakeEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % self.dimension;
            *counts.entry(bucket).or_insert(0.0) += 1.0;
        }
        let mut vector = vec![0.0; self.dimension];
        for (bucket, count) in counts {
            vector[bucket] = count;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        Ok(self.embed_sync(text))
    }
}

/// Test double that always fails, for exercising degraded selection.
#[cfg(test)]
pub struct FailingEmbeddingClient;

#[cfg(test)]
#[async_trait]
impl EmbeddingClient for FailingEmbeddingClient {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, SemanticError> {
        Err(SemanticError::StoreUnavailable("embedding offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_split_sections() {
        let md = "intro text\n\n# Install\nrun the installer\n\n## Linux\napt install\n";
        let sections = split_sections(md);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].0, "");
        assert_eq!(sections[1].0, "Install");
        assert_eq!(sections[2].0, "Linux");
        assert_eq!(sections[2].1, "apt install");
    }

    #[tokio::test]
    async fn test_store_search_orders_and_filters() {
        let store = InMemoryDocumentStore::new();
        let fake = FakeEmbeddingClient::new(64);
        store.add_chunk(
            "repo",
            "docs/api.md",
            "Endpoints",
            "endpoint reference for orders",
            fake.embed_sync("endpoint reference for orders"),
        );
        store.add_chunk(
            "repo",
            "docs/install.md",
            "Install",
            "installation steps",
            fake.embed_sync("installation steps"),
        );
        let query = fake.embed_sync("orders endpoint reference");
        let hits = store.search_similar(&query, "repo", 10, 0.5).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].path, "docs/api.md");
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_store_scopes_by_repo() {
        let store = InMemoryDocumentStore::new();
        let fake = FakeEmbeddingClient::new(64);
        store.add_chunk("other", "docs/api.md", "h", "text", fake.embed_sync("text"));
        let hits = store
            .search_similar(&fake.embed_sync("text"), "repo", 10, 0.0)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_get_chunks_returns_file_sections() {
        let store = InMemoryDocumentStore::new();
        store.add_chunk("repo", "docs/api.md", "A", "alpha", vec![1.0]);
        store.add_chunk("repo", "docs/api.md", "B", "beta", vec![1.0]);
        store.add_chunk("repo", "docs/other.md", "C", "gamma", vec![1.0]);
        let chunks = store.get_chunks("repo", "docs/api.md").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading, "A");
    }

    #[tokio::test]
    async fn test_poisoned_store_degrades_without_panic() {
        let store = std::sync::Arc::new(InMemoryDocumentStore::new());
        store.add_chunk("repo", "docs/a.md", "h", "alpha", vec![1.0]);
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.chunks.write().unwrap();
            panic!("poisoning the chunk store");
        })
        .join();

        // the infallible helpers recover the lock
        store.add_chunk("repo", "docs/a.md", "h2", "beta", vec![1.0]);
        assert_eq!(store.len(), 2);
        // the fallible store queries degrade instead of panicking
        let result = store.search_similar(&[1.0], "repo", 10, 0.0).await;
        assert!(matches!(result, Err(SemanticError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_index_docs_walks_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("nested")).unwrap();
        std::fs::write(docs.join("api.md"), "# API\ncontent\n").unwrap();
        std::fs::write(docs.join("nested/more.md"), "# More\nwords\n").unwrap();
        std::fs::write(docs.join("ignore.txt"), "not markdown").unwrap();

        let store = InMemoryDocumentStore::new();
        let fake = FakeEmbeddingClient::new(64);
        let indexed = index_docs(&store, &fake, "repo", dir.path(), &docs)
            .await
            .unwrap();
        assert_eq!(indexed, 2);
        assert_eq!(store.len(), 2);
        let chunks = store.get_chunks("repo", "docs/api.md").await.unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
