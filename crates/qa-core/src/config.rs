//! Configuration types for qa-search.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QaError, Result};
use crate::types::{Distance, Fusion};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaConfig {
    /// Vector store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Dense embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Sparse encoder configuration.
    #[serde(default)]
    pub sparse: SparseConfig,

    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which vector store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote Qdrant over gRPC.
    #[default]
    Qdrant,
    /// In-process store; contents are lost on exit.
    Memory,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Qdrant gRPC URL.
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Optional Qdrant API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the dense vector in the collection.
    #[serde(default = "default_dense_vector_name")]
    pub dense_vector_name: String,

    /// Name of the sparse vector in the collection.
    #[serde(default = "default_sparse_vector_name")]
    pub sparse_vector_name: String,

    /// Dense distance metric.
    #[serde(default)]
    pub distance: Distance,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: default_store_url(),
            api_key: None,
            collection: default_collection(),
            timeout_secs: default_timeout_secs(),
            dense_vector_name: default_dense_vector_name(),
            sparse_vector_name: default_sparse_vector_name(),
            distance: Distance::Cosine,
        }
    }
}

/// Which dense embedder to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    /// ONNX Runtime with a local model export.
    #[default]
    Onnx,
    /// Deterministic hash embeddings; no model required.
    Mock,
}

/// Dense embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend.
    #[serde(default)]
    pub backend: EmbedderBackend,

    /// Model identifier.
    #[serde(default = "default_dense_model")]
    pub model_name: String,

    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Embedding dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum tokens per text; longer input is truncated.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Number of threads for CPU inference.
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Feed a zeroed `token_type_ids` input (BERT-family exports).
    #[serde(default = "default_true")]
    pub token_type_ids: bool,

    /// Prefix prepended to query texts.
    #[serde(default)]
    pub query_prefix: String,

    /// Prefix prepended to document texts.
    #[serde(default)]
    pub document_prefix: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderBackend::Onnx,
            model_name: default_dense_model(),
            model_dir: default_model_dir(),
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            num_threads: default_num_threads(),
            token_type_ids: true,
            query_prefix: String::new(),
            document_prefix: String::new(),
        }
    }
}

/// Sparse BM25 encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseConfig {
    /// Model identifier.
    #[serde(default = "default_sparse_model")]
    pub model_name: String,

    /// Term frequency saturation.
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// Length normalization.
    #[serde(default = "default_b")]
    pub b: f32,

    /// Assumed average document length in tokens.
    #[serde(default = "default_avg_len")]
    pub avg_len: f32,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            model_name: default_sparse_model(),
            k1: default_k1(),
            b: default_b(),
            avg_len: default_avg_len(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of fused results.
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Candidates fetched per prefetch (store default when unset).
    #[serde(default)]
    pub prefetch_limit: Option<u64>,

    /// Results scoring below this are dropped.
    #[serde(default)]
    pub min_score: f32,

    /// Fusion method.
    #[serde(default)]
    pub fusion: Fusion,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            prefetch_limit: None,
            min_score: 0.0,
            fusion: Fusion::Rrf,
        }
    }
}

/// How question and answer rows become points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// One point per answer, embedded on the question body.
    Pairs,
    /// One point per question with all its answers, embedded on title and body.
    #[default]
    Grouped,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pairs => write!(f, "pairs"),
            Self::Grouped => write!(f, "grouped"),
        }
    }
}

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Questions CSV (`Id`, `Title`, `Body`).
    #[serde(default = "default_questions_path")]
    pub questions_path: PathBuf,

    /// Answers CSV (`ParentId`, `Body`).
    #[serde(default = "default_answers_path")]
    pub answers_path: PathBuf,

    /// Maximum number of questions to read.
    #[serde(default)]
    pub question_limit: Option<usize>,

    /// Record layout.
    #[serde(default)]
    pub mode: LoadMode,

    /// Remove HTML tags from bodies.
    #[serde(default = "default_true")]
    pub strip_html: bool,

    /// Records embedded and upserted per request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            questions_path: default_questions_path(),
            answers_path: default_answers_path(),
            question_limit: None,
            mode: LoadMode::Grouped,
            strip_html: true,
            batch_size: default_batch_size(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Allow cross-origin requests.
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_store_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection() -> String {
    "stackoverflow".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_dense_vector_name() -> String {
    "dense".to_string()
}

fn default_sparse_vector_name() -> String {
    "sparse".to_string()
}

fn default_dense_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qa-search")
        .join("models")
        .join("all-MiniLM-L6-v2")
}

fn default_dimension() -> usize {
    384
}

fn default_max_tokens() -> usize {
    256
}

fn default_num_threads() -> usize {
    4
}

fn default_sparse_model() -> String {
    "Qdrant/bm25".to_string()
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

fn default_avg_len() -> f32 {
    256.0
}

fn default_limit() -> u64 {
    10
}

fn default_questions_path() -> PathBuf {
    PathBuf::from("data/Questions.csv")
}

fn default_answers_path() -> PathBuf {
    PathBuf::from("data/Answers.csv")
}

fn default_batch_size() -> usize {
    64
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

impl QaConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| QaError::config(format!("Failed to parse config: {}", e)))
    }

    /// Render configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| QaError::config(format!("Failed to render config: {}", e)))
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("qa-search").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("qa-search.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VECTOR_STORE_URL") {
            self.store.url = v;
        }
        if let Some(v) = lookup("VECTOR_STORE_API_KEY") {
            self.store.api_key = Some(v);
        }
        if let Some(v) = lookup("VECTOR_STORE_COLLECTION") {
            self.store.collection = v;
        }
        if let Some(v) = lookup("DENSE_VECTOR_NAME") {
            self.store.dense_vector_name = v;
        }
        if let Some(v) = lookup("SPARSE_VECTOR_NAME") {
            self.store.sparse_vector_name = v;
        }
        if let Some(v) = lookup("DENSE_MODEL_NAME") {
            self.embedding.model_name = v;
        }
        if let Some(v) = lookup("DENSE_MODEL_DIR") {
            self.embedding.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SPARSE_MODEL_NAME") {
            self.sparse.model_name = v;
        }
        if let Some(v) = lookup("VECTOR_SEARCH_LIMIT") {
            self.search.limit = parse_var("VECTOR_SEARCH_LIMIT", &v)?;
        }
        if let Some(v) = lookup("VECTOR_STORE_SEARCH_MIN_SCORE") {
            self.search.min_score = parse_var("VECTOR_STORE_SEARCH_MIN_SCORE", &v)?;
        }
        if let Some(v) = lookup("QUESTIONS_PATH") {
            self.loader.questions_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ANSWERS_PATH") {
            self.loader.answers_path = PathBuf::from(v);
        }
        // QUESTIONS_LIMIT takes precedence over the older ROW_LIMIT
        if let Some(v) = lookup("QUESTIONS_LIMIT").or_else(|| lookup("ROW_LIMIT")) {
            self.loader.question_limit = Some(parse_var("QUESTIONS_LIMIT", &v)?);
        }
        if let Some(v) = lookup("SERVER_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        Ok(())
    }

    /// Check values that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.store.collection.trim().is_empty() {
            return Err(QaError::config("store.collection must not be empty"));
        }
        if self.store.dense_vector_name == self.store.sparse_vector_name {
            return Err(QaError::config(
                "dense and sparse vector names must differ",
            ));
        }
        if self.search.limit == 0 {
            return Err(QaError::config("search.limit must be at least 1"));
        }
        if self.loader.batch_size == 0 {
            return Err(QaError::config("loader.batch_size must be at least 1"));
        }
        if self.embedding.dimension == 0 {
            return Err(QaError::config("embedding.dimension must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| QaError::config(format!("{}={:?}: {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = QaConfig::default();
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.search.fusion, Fusion::Rrf);
        assert_eq!(config.store.distance, Distance::Cosine);
        assert_eq!(config.loader.mode, LoadMode::Grouped);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = QaConfig::from_toml(
            r#"
            [store]
            collection = "so"

            [search]
            limit = 5
            min_score = 0.25
            fusion = "dbsf"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.collection, "so");
        assert_eq!(config.store.dense_vector_name, "dense");
        assert_eq!(config.search.limit, 5);
        assert_eq!(config.search.fusion, Fusion::Dbsf);
        assert!((config.search.min_score - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_toml_render_parses_back() {
        let config = QaConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed = QaConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.store.url, config.store.url);
        assert_eq!(parsed.loader.batch_size, config.loader.batch_size);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa-search.toml");
        std::fs::write(&path, "[server]\nbind_address = \"127.0.0.1:9000\"\n").unwrap();
        let config = QaConfig::load(&path).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = QaConfig::default();
        config
            .apply_env_from(env(&[
                ("VECTOR_STORE_URL", "http://qdrant:6334"),
                ("VECTOR_STORE_COLLECTION", "questions"),
                ("DENSE_VECTOR_NAME", "all-minilm"),
                ("SPARSE_VECTOR_NAME", "bm25"),
                ("VECTOR_SEARCH_LIMIT", "3"),
                ("VECTOR_STORE_SEARCH_MIN_SCORE", "0.4"),
                ("ROW_LIMIT", "100"),
            ]))
            .unwrap();
        assert_eq!(config.store.url, "http://qdrant:6334");
        assert_eq!(config.store.collection, "questions");
        assert_eq!(config.store.dense_vector_name, "all-minilm");
        assert_eq!(config.store.sparse_vector_name, "bm25");
        assert_eq!(config.search.limit, 3);
        assert_eq!(config.loader.question_limit, Some(100));
    }

    #[test]
    fn test_env_overrides_from_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# deployment settings\n\
             VECTOR_STORE_URL=http://qdrant:6334\n\
             DENSE_VECTOR_NAME=\"all-MiniLM-L6-v2\"\n\
             VECTOR_STORE_SEARCH_MIN_SCORE=0.4\n\
             ROW_LIMIT=100\n",
        )
        .unwrap();

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .unwrap()
            .map(|item| item.unwrap())
            .collect();

        let mut config = QaConfig::default();
        config
            .apply_env_from(|key| vars.get(key).cloned())
            .unwrap();

        assert_eq!(config.store.url, "http://qdrant:6334");
        assert_eq!(config.store.dense_vector_name, "all-MiniLM-L6-v2");
        assert!((config.search.min_score - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.loader.question_limit, Some(100));
        assert_eq!(config.store.collection, "stackoverflow");
    }

    #[test]
    fn test_questions_limit_wins_over_row_limit() {
        let mut config = QaConfig::default();
        config
            .apply_env_from(env(&[("ROW_LIMIT", "100"), ("QUESTIONS_LIMIT", "7")]))
            .unwrap();
        assert_eq!(config.loader.question_limit, Some(7));
    }

    #[test]
    fn test_bad_numeric_env() {
        let mut config = QaConfig::default();
        let err = config
            .apply_env_from(env(&[("VECTOR_SEARCH_LIMIT", "ten")]))
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("VECTOR_SEARCH_LIMIT"));
    }

    #[test]
    fn test_validate_rejects_same_vector_names() {
        let mut config = QaConfig::default();
        config.store.sparse_vector_name = config.store.dense_vector_name.clone();
        assert!(config.validate().is_err());
    }
}
