//! In-process vector store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use qa_core::{
    CollectionSchema, Distance, Fusion, HybridQuery, QaError, QaPoint, Result, ScoredPayload,
    SparseVector, VectorStore,
};

use crate::fusion::{distribution_based_fusion, reciprocal_rank_fusion, DEFAULT_RRF_K};

/// Candidates per prefetch when the query does not set a limit.
const DEFAULT_PREFETCH_LIMIT: u64 = 10;

struct Collection {
    schema: CollectionSchema,
    points: BTreeMap<u64, QaPoint>,
}

/// Exact-search store kept in memory.
///
/// Mirrors the Qdrant semantics this crate relies on: named dense and
/// sparse vectors, upsert by id, optional IDF on the sparse vector, and
/// fused prefetch queries.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|e| QaError::store(format!("Failed to lock store: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|e| QaError::store(format!("Failed to lock store: {}", e)))
    }
}

fn dense_score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => {
            let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                dot / (na * nb)
            }
        }
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        // Larger is better everywhere, so report negated distance
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt(),
    }
}

fn sparse_score(query: &SparseVector, doc: &SparseVector, idf: Option<&HashMap<u32, f32>>) -> f32 {
    // Both index lists are sorted ascending
    let (mut i, mut j) = (0, 0);
    let mut score = 0.0;
    while i < query.indices.len() && j < doc.indices.len() {
        match query.indices[i].cmp(&doc.indices[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let weight = idf
                    .and_then(|m| m.get(&query.indices[i]))
                    .copied()
                    .unwrap_or(1.0);
                score += query.values[i] * doc.values[j] * weight;
                i += 1;
                j += 1;
            }
        }
    }
    score
}

/// BM25 inverse document frequency for the query terms.
fn idf_weights(query: &SparseVector, points: &BTreeMap<u64, QaPoint>) -> HashMap<u32, f32> {
    let n = points.len() as f32;
    query
        .indices
        .iter()
        .map(|idx| {
            let df = points
                .values()
                .filter(|p| p.sparse.indices.binary_search(idx).is_ok())
                .count() as f32;
            (*idx, (((n - df + 0.5) / (df + 0.5)) + 1.0).ln())
        })
        .collect()
}

fn top_k(mut scored: Vec<(u64, f32)>, k: usize) -> Vec<(u64, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(&schema.name) {
            return Err(QaError::store(format!(
                "Collection `{}` already exists",
                schema.name
            )));
        }
        info!(
            "Creating in-memory collection '{}' (dense {} x {}, sparse {})",
            schema.name, schema.dense_vector_name, schema.dense_size, schema.sparse_vector_name
        );
        collections.insert(
            schema.name.clone(),
            Collection {
                schema: schema.clone(),
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.write()?.remove(name);
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<QaPoint>) -> Result<()> {
        let mut collections = self.write()?;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| QaError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        for point in points {
            if point.dense.len() as u64 != coll.schema.dense_size {
                return Err(QaError::store(format!(
                    "Wrong input: vector `{}` dimension error: expected {}, got {}",
                    coll.schema.dense_vector_name,
                    coll.schema.dense_size,
                    point.dense.len()
                )));
            }
            coll.points.insert(point.id, point);
        }
        Ok(())
    }

    async fn count_points(&self, collection: &str) -> Result<u64> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| QaError::CollectionNotFound {
                name: collection.to_string(),
            })
    }

    async fn hybrid_query(
        &self,
        collection: &str,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredPayload>> {
        let collections = self.read()?;
        let coll = collections
            .get(collection)
            .ok_or_else(|| QaError::CollectionNotFound {
                name: collection.to_string(),
            })?;
        let schema = &coll.schema;

        if query.dense_using != schema.dense_vector_name {
            return Err(QaError::store(format!(
                "Wrong input: Not existing vector name error: {}",
                query.dense_using
            )));
        }
        if query.sparse_using != schema.sparse_vector_name {
            return Err(QaError::store(format!(
                "Wrong input: Not existing vector name error: {}",
                query.sparse_using
            )));
        }
        if query.dense.len() as u64 != schema.dense_size {
            return Err(QaError::store(format!(
                "Wrong input: vector dimension error: expected {}, got {}",
                schema.dense_size,
                query.dense.len()
            )));
        }

        let prefetch = query.prefetch_limit.unwrap_or(DEFAULT_PREFETCH_LIMIT) as usize;

        let dense_hits = top_k(
            coll.points
                .values()
                .map(|p| (p.id, dense_score(schema.distance, &query.dense, &p.dense)))
                .collect(),
            prefetch,
        );

        let idf = schema
            .sparse_idf
            .then(|| idf_weights(&query.sparse, &coll.points));
        let sparse_hits = top_k(
            coll.points
                .values()
                .map(|p| (p.id, sparse_score(&query.sparse, &p.sparse, idf.as_ref())))
                // Sparse search only returns points sharing at least one term
                .filter(|(_, s)| *s > 0.0)
                .collect(),
            prefetch,
        );

        debug!(
            "Prefetch returned {} dense and {} sparse candidates",
            dense_hits.len(),
            sparse_hits.len()
        );

        let limit = query.limit as usize;
        let fused = match query.fusion {
            Fusion::Rrf => reciprocal_rank_fusion(vec![dense_hits, sparse_hits], DEFAULT_RRF_K, limit),
            Fusion::Dbsf => distribution_based_fusion(vec![dense_hits, sparse_hits], limit),
        };

        Ok(fused
            .into_iter()
            .filter_map(|(id, score)| {
                coll.points.get(&id).map(|p| ScoredPayload {
                    id,
                    score,
                    payload: p.payload.clone(),
                })
            })
            .collect())
    }
}
