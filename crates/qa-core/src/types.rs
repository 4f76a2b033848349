//! Core domain types for hybrid Q&A search.

use serde::{Deserialize, Serialize};

/// JSON object stored alongside each point and returned by searches.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Distance metric for the dense vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
            Self::Euclid => "euclid",
        };
        write!(f, "{}", s)
    }
}

/// Fusion method applied to the prefetch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fusion {
    /// Reciprocal Rank Fusion.
    #[default]
    Rrf,
    /// Distribution-Based Score Fusion.
    Dbsf,
}

impl std::fmt::Display for Fusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rrf => write!(f, "rrf"),
            Self::Dbsf => write!(f, "dbsf"),
        }
    }
}

/// A sparse vector as parallel index/value arrays.
///
/// Indices are unique and sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Build a sparse vector from (index, value) pairs.
    ///
    /// Duplicate indices are summed.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
        let mut pairs: Vec<(u32, f32)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(i, _)| *i);

        let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (idx, value) in pairs {
            if indices.last() == Some(&idx) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
            } else {
                indices.push(idx);
                values.push(value);
            }
        }

        Self { indices, values }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over (index, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Shape of a collection: one named dense vector and one named sparse vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name.
    pub name: String,

    /// Name of the dense vector.
    pub dense_vector_name: String,

    /// Dense vector size; depends on the embedding model.
    pub dense_size: u64,

    /// Dense distance metric.
    pub distance: Distance,

    /// Name of the sparse vector.
    pub sparse_vector_name: String,

    /// Apply inverse document frequency to the sparse vector at query time.
    pub sparse_idf: bool,
}

/// A point to upsert: id, both vectors and the payload.
#[derive(Debug, Clone)]
pub struct QaPoint {
    pub id: u64,
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub payload: Payload,
}

/// A fused hybrid query.
///
/// Two prefetches (dense and sparse) are fused into a single ranking.
#[derive(Debug, Clone)]
pub struct HybridQuery {
    /// Dense vector name to search.
    pub dense_using: String,

    /// Dense query vector.
    pub dense: Vec<f32>,

    /// Sparse vector name to search.
    pub sparse_using: String,

    /// Sparse query vector.
    pub sparse: SparseVector,

    /// How the two result lists are combined.
    pub fusion: Fusion,

    /// Per-prefetch candidate limit (store default when None).
    pub prefetch_limit: Option<u64>,

    /// Maximum number of fused results.
    pub limit: u64,
}

/// A point returned by a query, with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPayload {
    pub id: u64,
    pub score: f32,
    pub payload: Payload,
}

/// A question read from the questions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// An answer read from the answers file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub parent_id: String,
    pub body: String,
}

/// Payload of a single question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub title: String,
    pub question: String,
    pub answer: String,
}

/// Payload of a question with all of its answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaThread {
    pub title: String,
    pub question: String,
    pub answers: Vec<String>,
}

/// A record ready to be embedded and uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct QaRecord {
    /// Text fed to both embedders.
    pub text: String,

    /// Metadata stored with the point.
    pub payload: Payload,
}

impl QaRecord {
    /// Build a record from any serializable payload object.
    pub fn new(text: impl Into<String>, payload: &impl Serialize) -> crate::Result<Self> {
        match serde_json::to_value(payload)? {
            serde_json::Value::Object(map) => Ok(Self {
                text: text.into(),
                payload: map,
            }),
            other => Err(crate::QaError::internal(format!(
                "payload must serialize to an object, got {}",
                other
            ))),
        }
    }
}

/// Counts reported after a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Questions read.
    pub questions: usize,

    /// Answers attached to a loaded question.
    pub answers: usize,

    /// Answers whose parent question was not loaded.
    pub orphan_answers: usize,

    /// Points uploaded.
    pub points: usize,

    /// Whether the collection was created by this load.
    pub created_collection: bool,
}

/// Collection statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub collection: String,
    pub points: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_from_pairs_sorts_and_merges() {
        let v = SparseVector::from_pairs([(7, 1.0), (3, 0.5), (7, 2.0)]);
        assert_eq!(v.indices, vec![3, 7]);
        assert_eq!(v.values, vec![0.5, 3.0]);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_sparse_empty() {
        let v = SparseVector::from_pairs(Vec::new());
        assert!(v.is_empty());
    }

    #[test]
    fn test_record_payload_pair() {
        let pair = QaPair {
            title: "Borrow checker".to_string(),
            question: "Why?".to_string(),
            answer: "Because.".to_string(),
        };
        let record = QaRecord::new("Why?", &pair).unwrap();
        assert_eq!(record.payload["title"], "Borrow checker");
        assert_eq!(record.payload["answer"], "Because.");
    }

    #[test]
    fn test_record_payload_thread() {
        let thread = QaThread {
            title: "t".to_string(),
            question: "q".to_string(),
            answers: vec!["a1".to_string(), "a2".to_string()],
        };
        let record = QaRecord::new("t. q", &thread).unwrap();
        assert_eq!(record.payload["answers"], serde_json::json!(["a1", "a2"]));
    }

    #[test]
    fn test_record_rejects_non_object() {
        assert!(QaRecord::new("x", &vec![1, 2]).is_err());
    }

    #[test]
    fn test_fusion_serde() {
        let f: Fusion = serde_json::from_str("\"dbsf\"").unwrap();
        assert_eq!(f, Fusion::Dbsf);
        assert_eq!(Fusion::default().to_string(), "rrf");
    }
}
