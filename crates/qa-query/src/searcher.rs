//! Hybrid searcher.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use qa_core::{
    Embedder, Fusion, HybridQuery, Payload, QaConfig, QaError, Result, ScoredPayload,
    SparseEncoder, VectorStore,
};

/// Settings for search queries.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Collection to search.
    pub collection: String,

    /// Dense vector name.
    pub dense_using: String,

    /// Sparse vector name.
    pub sparse_using: String,

    /// Maximum number of fused results.
    pub limit: u64,

    /// Candidates fetched per prefetch.
    pub prefetch_limit: Option<u64>,

    /// Results scoring below this are dropped.
    pub min_score: f32,

    /// Fusion method.
    pub fusion: Fusion,
}

impl SearchSettings {
    pub fn from_config(config: &QaConfig) -> Self {
        Self {
            collection: config.store.collection.clone(),
            dense_using: config.store.dense_vector_name.clone(),
            sparse_using: config.store.sparse_vector_name.clone(),
            limit: config.search.limit,
            prefetch_limit: config.search.prefetch_limit,
            min_score: config.search.min_score,
            fusion: config.search.fusion,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&QaConfig::default())
    }
}

/// Stateless hybrid searcher.
///
/// Every call issues exactly one fused query against the store.
pub struct HybridSearcher {
    store: Arc<dyn VectorStore>,
    dense: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
    settings: SearchSettings,
}

impl HybridSearcher {
    /// Create a new searcher.
    pub fn new(
        store: Arc<dyn VectorStore>,
        dense: Arc<dyn Embedder>,
        sparse: Arc<dyn SparseEncoder>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            store,
            dense,
            sparse,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search and return the payloads of results at or above the minimum score.
    pub async fn search(&self, text: &str) -> Result<Vec<Payload>> {
        Ok(self
            .search_scored(text, None)
            .await?
            .into_iter()
            .map(|hit| hit.payload)
            .collect())
    }

    /// Search and keep ids and fused scores.
    ///
    /// `limit` overrides the configured result limit for this call.
    pub async fn search_scored(&self, text: &str, limit: Option<u64>) -> Result<Vec<ScoredPayload>> {
        if text.trim().is_empty() {
            return Err(QaError::invalid_argument("query text must not be empty"));
        }
        let limit = limit.unwrap_or(self.settings.limit);
        if limit == 0 {
            return Err(QaError::invalid_argument("limit must be at least 1"));
        }

        let start = Instant::now();

        info!("Searching for: {:?}", text);

        let query = self.build_query(text, limit).await?;
        let hits = self
            .store
            .hybrid_query(&self.settings.collection, &query)
            .await?;

        let fetched = hits.len();
        let results: Vec<ScoredPayload> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.settings.min_score)
            .collect();

        debug!(
            "Kept {} of {} results with score >= {}",
            results.len(),
            fetched,
            self.settings.min_score
        );

        info!(
            "Search completed in {}ms, returned {} results",
            start.elapsed().as_millis(),
            results.len()
        );

        Ok(results)
    }

    /// Embed the text both ways and assemble the fused query.
    async fn build_query(&self, text: &str, limit: u64) -> Result<HybridQuery> {
        let dense = self.dense.embed_query(text).await?;
        let sparse = self.sparse.encode_query(text)?;

        debug!(
            "Query vectors: dense {} dims ({}), sparse {} terms ({})",
            dense.len(),
            self.dense.model_name(),
            sparse.len(),
            self.sparse.model_name()
        );

        Ok(HybridQuery {
            dense_using: self.settings.dense_using.clone(),
            dense,
            sparse_using: self.settings.sparse_using.clone(),
            sparse,
            fusion: self.settings.fusion,
            prefetch_limit: self.settings.prefetch_limit,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::{CollectionSchema, Distance, QaPoint};
    use qa_embed::{Bm25Encoder, MockEmbedder};
    use qa_store::MemoryStore;
    use serde_json::json;

    const DOCS: &[(&str, &str)] = &[
        ("Reverse a list in Python", "How do I reverse a python list?"),
        ("Tokio runtime panics", "Why does the tokio runtime panic inside block_on?"),
        ("Borrow checker", "Cannot borrow as mutable more than once in rust"),
    ];

    async fn searcher(settings: SearchSettings) -> HybridSearcher {
        let store = Arc::new(MemoryStore::new());
        let dense = Arc::new(MockEmbedder::with_config(64, 256));
        let sparse = Arc::new(Bm25Encoder::new());

        store
            .create_collection(&CollectionSchema {
                name: settings.collection.clone(),
                dense_vector_name: settings.dense_using.clone(),
                dense_size: 64,
                distance: Distance::Cosine,
                sparse_vector_name: settings.sparse_using.clone(),
                sparse_idf: true,
            })
            .await
            .unwrap();

        let texts: Vec<&str> = DOCS.iter().map(|(_, q)| *q).collect();
        let dense_vecs = dense.embed_documents(&texts).await.unwrap();
        let sparse_vecs = sparse.encode_documents(&texts).unwrap();

        let points = DOCS
            .iter()
            .zip(dense_vecs.into_iter().zip(sparse_vecs))
            .enumerate()
            .map(|(id, ((title, question), (d, s)))| {
                let mut payload = Payload::new();
                payload.insert("title".to_string(), json!(title));
                payload.insert("question".to_string(), json!(question));
                QaPoint {
                    id: id as u64,
                    dense: d,
                    sparse: s,
                    payload,
                }
            })
            .collect();
        store
            .upsert_points(&settings.collection, points)
            .await
            .unwrap();

        HybridSearcher::new(store, dense, sparse, settings)
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = QaConfig::default();
        config.search.limit = 4;
        config.search.min_score = 0.2;
        let settings = SearchSettings::from_config(&config);
        assert_eq!(settings.limit, 4);
        assert_eq!(settings.collection, "stackoverflow");
        assert_eq!(settings.dense_using, "dense");
        assert!((settings.min_score - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_search_returns_payloads_in_rank_order() {
        let searcher = searcher(SearchSettings::default()).await;

        let results = searcher.search("reverse python list").await.unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0]["title"], "Reverse a list in Python");
    }

    #[tokio::test]
    async fn test_min_score_is_inclusive() {
        let base = searcher(SearchSettings::default()).await;
        let scored = base.search_scored("tokio runtime", None).await.unwrap();
        let top = scored[0].score;

        let settings = SearchSettings {
            min_score: top,
            ..Default::default()
        };
        let strict = searcher(settings).await;
        let kept = strict.search_scored("tokio runtime", None).await.unwrap();

        assert!(!kept.is_empty());
        assert!(kept.iter().all(|hit| hit.score >= top));
        assert_eq!(kept[0].payload["title"], "Tokio runtime panics");
    }

    #[tokio::test]
    async fn test_min_score_above_everything() {
        let settings = SearchSettings {
            min_score: 10.0,
            ..Default::default()
        };
        let searcher = searcher(settings).await;
        assert!(searcher.search("borrow").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_override() {
        let searcher = searcher(SearchSettings::default()).await;
        let hits = searcher.search_scored("rust python tokio", Some(1)).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let searcher = searcher(SearchSettings::default()).await;
        let err = searcher.search("   ").await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let searcher = searcher(SearchSettings::default()).await;
        let other = HybridSearcher::new(
            searcher.store.clone(),
            searcher.dense.clone(),
            searcher.sparse.clone(),
            SearchSettings {
                collection: "missing".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(other.settings().collection, "missing");
        let err = other.search("rust").await.unwrap_err();
        assert_eq!(err.error_code(), "COLLECTION_NOT_FOUND");
    }
}
