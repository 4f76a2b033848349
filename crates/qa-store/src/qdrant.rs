//! Qdrant-backed vector store.

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance as QdrantDistance,
    Fusion as QdrantFusion, Modifier, NamedVectors, PointId, PointStruct, PrefetchQueryBuilder,
    Query, QueryPoints, QueryPointsBuilder, SparseVectorParamsBuilder, SparseVectorsConfigBuilder,
    UpsertPointsBuilder, Vector, VectorInput, VectorParamsBuilder, VectorsConfigBuilder,
};
use qdrant_client::{Payload as QdrantPayload, Qdrant, QdrantError};
use tracing::{debug, info, warn};

use qa_core::{
    CollectionSchema, Distance, Fusion, HybridQuery, Payload, QaError, QaPoint, Result,
    ScoredPayload, StoreConfig, VectorStore,
};

/// Qdrant store over gRPC.
///
/// Points are written under the configured dense and sparse vector names.
pub struct QdrantStore {
    client: Qdrant,
    dense_vector_name: String,
    sparse_vector_name: String,
}

fn store_err(context: &'static str) -> impl FnOnce(QdrantError) -> QaError {
    move |e| QaError::store(format!("{}: {}", context, e))
}

impl QdrantStore {
    /// Build a client for the configured URL. The connection is made lazily.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        info!("Connecting to Qdrant at {}", config.url);

        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }

        let client = builder
            .build()
            .map_err(store_err("Failed to create Qdrant client"))?;

        Ok(Self::with_client(
            client,
            &config.dense_vector_name,
            &config.sparse_vector_name,
        ))
    }

    /// Wrap an existing client.
    pub fn with_client(client: Qdrant, dense_vector_name: &str, sparse_vector_name: &str) -> Self {
        Self {
            client,
            dense_vector_name: dense_vector_name.to_string(),
            sparse_vector_name: sparse_vector_name.to_string(),
        }
    }
}

fn to_qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
        Distance::Euclid => QdrantDistance::Euclid,
    }
}

fn to_qdrant_fusion(fusion: Fusion) -> QdrantFusion {
    match fusion {
        Fusion::Rrf => QdrantFusion::Rrf,
        Fusion::Dbsf => QdrantFusion::Dbsf,
    }
}

fn to_point_struct(point: QaPoint, schema_names: (&str, &str)) -> Result<PointStruct> {
    let (dense_name, sparse_name) = schema_names;
    let vectors = NamedVectors::default()
        .add_vector(dense_name, Vector::new_dense(point.dense))
        .add_vector(
            sparse_name,
            Vector::new_sparse(point.sparse.indices, point.sparse.values),
        );
    let payload = QdrantPayload::try_from(serde_json::Value::Object(point.payload))
        .map_err(store_err("Invalid payload"))?;
    Ok(PointStruct::new(point.id, vectors, payload))
}

/// Build the fused query: dense and sparse prefetches under one fusion.
fn query_request(collection: &str, query: &HybridQuery) -> QueryPoints {
    let mut dense = PrefetchQueryBuilder::default()
        .query(Query::new_nearest(query.dense.clone()))
        .using(query.dense_using.as_str());
    let mut sparse = PrefetchQueryBuilder::default()
        .query(Query::new_nearest(VectorInput::new_sparse(
            query.sparse.indices.clone(),
            query.sparse.values.clone(),
        )))
        .using(query.sparse_using.as_str());

    if let Some(limit) = query.prefetch_limit {
        dense = dense.limit(limit);
        sparse = sparse.limit(limit);
    }

    QueryPointsBuilder::new(collection)
        .add_prefetch(dense)
        .add_prefetch(sparse)
        .query(Query::new_fusion(to_qdrant_fusion(query.fusion)))
        .limit(query.limit)
        .with_payload(true)
        .build()
}

fn point_id(id: Option<PointId>) -> Option<u64> {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(n)) => Some(n),
        Some(PointIdOptions::Uuid(uuid)) => {
            warn!("Skipping point with non-numeric id {}", uuid);
            None
        }
        None => None,
    }
}

fn payload_to_json(
    payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> Payload {
    payload.into_iter().map(|(k, v)| (k, v.into_json())).collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.client
            .collection_exists(name)
            .await
            .map_err(store_err("Failed to check collection"))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        info!(
            "Creating collection '{}' (dense '{}' size {} {}, sparse '{}' idf={})",
            schema.name,
            schema.dense_vector_name,
            schema.dense_size,
            schema.distance,
            schema.sparse_vector_name,
            schema.sparse_idf
        );

        let mut vectors_config = VectorsConfigBuilder::default();
        vectors_config.add_named_vector_params(
            schema.dense_vector_name.as_str(),
            VectorParamsBuilder::new(schema.dense_size, to_qdrant_distance(schema.distance)),
        );

        let mut sparse_params = SparseVectorParamsBuilder::default();
        if schema.sparse_idf {
            sparse_params = sparse_params.modifier(Modifier::Idf);
        }
        let mut sparse_config = SparseVectorsConfigBuilder::default();
        sparse_config.add_named_vector_params(schema.sparse_vector_name.as_str(), sparse_params);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(schema.name.as_str())
                    .vectors_config(vectors_config)
                    .sparse_vectors_config(sparse_config),
            )
            .await
            .map_err(store_err("Failed to create collection"))?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        info!("Deleting collection '{}'", name);
        self.client
            .delete_collection(name)
            .await
            .map_err(store_err("Failed to delete collection"))?;
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<QaPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        let structs = points
            .into_iter()
            .map(|p| {
                to_point_struct(p, (&self.dense_vector_name, &self.sparse_vector_name))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(store_err("Failed to upsert points"))?;

        debug!("Upserted {} points into '{}'", count, collection);
        Ok(())
    }

    async fn count_points(&self, collection: &str) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(store_err("Failed to count points"))?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn hybrid_query(
        &self,
        collection: &str,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredPayload>> {
        let response = self
            .client
            .query(query_request(collection, query))
            .await
            .map_err(store_err("Query failed"))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                point_id(point.id).map(|id| ScoredPayload {
                    id,
                    score: point.score,
                    payload: payload_to_json(point.payload),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::SparseVector;

    fn hybrid(prefetch_limit: Option<u64>) -> HybridQuery {
        HybridQuery {
            dense_using: "dense".to_string(),
            dense: vec![0.1, 0.2, 0.3],
            sparse_using: "sparse".to_string(),
            sparse: SparseVector::from_pairs([(4, 1.0), (9, 1.0)]),
            fusion: Fusion::Rrf,
            prefetch_limit,
            limit: 7,
        }
    }

    #[test]
    fn test_query_request_has_two_prefetches() {
        let request = query_request("stackoverflow", &hybrid(None));

        assert_eq!(request.collection_name, "stackoverflow");
        assert_eq!(request.limit, Some(7));
        assert_eq!(request.prefetch.len(), 2);
        assert_eq!(request.prefetch[0].using.as_deref(), Some("dense"));
        assert_eq!(request.prefetch[1].using.as_deref(), Some("sparse"));
        assert!(request.prefetch.iter().all(|p| p.limit.is_none()));
        assert!(request.filter.is_none());
        assert!(request.query.is_some());
    }

    #[test]
    fn test_query_request_prefetch_limit() {
        let request = query_request("c", &hybrid(Some(50)));
        assert!(request.prefetch.iter().all(|p| p.limit == Some(50)));
    }

    #[test]
    fn test_distance_mapping() {
        assert_eq!(to_qdrant_distance(Distance::Cosine), QdrantDistance::Cosine);
        assert_eq!(to_qdrant_distance(Distance::Euclid), QdrantDistance::Euclid);
        assert_eq!(to_qdrant_fusion(Fusion::Dbsf), QdrantFusion::Dbsf);
    }

    #[test]
    fn test_point_id() {
        assert_eq!(point_id(Some(PointId::from(42u64))), Some(42));
        assert_eq!(point_id(None), None);
    }

    #[test]
    fn test_point_struct_payload() {
        let mut payload = Payload::new();
        payload.insert("title".to_string(), serde_json::json!("t"));
        let point = QaPoint {
            id: 3,
            dense: vec![1.0, 0.0],
            sparse: SparseVector::from_pairs([(1, 0.5)]),
            payload,
        };
        let built = to_point_struct(point, ("dense", "sparse")).unwrap();
        assert!(built.payload.contains_key("title"));
        assert_eq!(point_id(built.id), Some(3));
    }
}
