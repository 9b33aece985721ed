use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .docsmith.toml.
/// All fields have defaults so the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Embedding API settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Target-file selection thresholds
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Patch history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-style API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key. If None, falls back to the DOCSMITH_API_KEY env var.
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Minimum cosine similarity for a semantic match
    #[serde(default = "default_similarity")]
    pub similarity_threshold: f32,

    /// Keyword overlap above which existing content counts as duplicate
    #[serde(default = "default_duplicate")]
    pub duplicate_threshold: f32,

    /// Maximum target files per task
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity(),
            duplicate_threshold: default_duplicate(),
            max_files: default_max_files(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_similarity() -> f32 {
    0.5
}

fn default_duplicate() -> f32 {
    0.9
}

fn default_max_files() -> usize {
    3
}

fn default_history_path() -> String {
    ".docsmith/history.jsonl".to_string()
}

impl Config {
    /// Load configuration from .docsmith.toml in the repository root.
    /// Returns default config if the file doesn't exist.
    pub fn load(repo_root: &Path) -> Result<Config, ConfigError> {
        let path = repo_root.join(".docsmith.toml");
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the embedding API key: config file value takes precedence,
    /// falls back to DOCSMITH_API_KEY env var.
    pub fn embedding_api_key(&self) -> Option<String> {
        self.embedding
            .api_key
            .clone()
            .or_else(|| std::env::var("DOCSMITH_API_KEY").ok())
    }
}
