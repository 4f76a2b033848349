//! BM25 sparse encoder.
//!
//! Documents get the BM25 term-frequency component per token; queries get a
//! weight of 1.0 per unique token. The inverse document frequency half of
//! BM25 is computed by the vector store over the whole collection, so the
//! collection must be created with IDF enabled on the sparse vector.

use std::collections::HashMap;

use qa_core::{Result, SparseConfig, SparseEncoder, SparseVector};

/// Tokens longer than this are dropped (base64 blobs, URLs, hashes).
const MAX_TOKEN_LEN: usize = 40;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Split text into lowercase alphanumeric tokens, dropping stop words.
///
/// `_` is kept inside tokens so identifiers like `snake_case` survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() <= MAX_TOKEN_LEN)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Map a token to a sparse index.
fn token_index(token: &str) -> u32 {
    let hash = blake3::hash(token.as_bytes());
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// BM25 term-weight encoder over hashed tokens.
#[derive(Debug, Clone)]
pub struct Bm25Encoder {
    model_name: String,
    k1: f32,
    b: f32,
    avg_len: f32,
}

impl Bm25Encoder {
    /// Create an encoder with the standard parameters (k1 = 1.2, b = 0.75).
    pub fn new() -> Self {
        Self::from_config(&SparseConfig::default())
    }

    pub fn from_config(config: &SparseConfig) -> Self {
        Self {
            model_name: config.model_name.clone(),
            k1: config.k1,
            b: config.b,
            avg_len: if config.avg_len > 0.0 { config.avg_len } else { 1.0 },
        }
    }

    fn encode_document(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let doc_len = tokens.len() as f32;

        let mut tf: HashMap<u32, f32> = HashMap::new();
        for token in &tokens {
            *tf.entry(token_index(token)).or_default() += 1.0;
        }

        let norm = self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_len);
        SparseVector::from_pairs(
            tf.into_iter()
                .map(|(idx, freq)| (idx, freq * (self.k1 + 1.0) / (freq + norm))),
        )
    }
}

impl Default for Bm25Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseEncoder for Bm25Encoder {
    fn encode_documents(&self, texts: &[&str]) -> Result<Vec<SparseVector>> {
        Ok(texts.iter().map(|t| self.encode_document(t)).collect())
    }

    fn encode_query(&self, text: &str) -> Result<SparseVector> {
        let mut indices: Vec<u32> = tokenize(text).iter().map(|t| token_index(t)).collect();
        indices.sort_unstable();
        indices.dedup();
        let values = vec![1.0; indices.len()];
        Ok(SparseVector { indices, values })
    }

    fn uses_idf(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("How do I reverse a List in Python? Use list[::-1]");
        assert_eq!(tokens, vec!["reverse", "list", "python", "use", "list", "1"]);
    }

    #[test]
    fn test_tokenize_keeps_identifiers() {
        assert_eq!(tokenize("call my_func()"), vec!["call", "my_func"]);
    }

    #[test]
    fn test_tokenize_drops_long_tokens() {
        let blob = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(tokenize(&format!("short {}", blob)), vec!["short"]);
    }

    #[test]
    fn test_query_weights_are_unit() {
        let encoder = Bm25Encoder::new();
        let q = encoder.encode_query("python python list").unwrap();
        assert_eq!(q.len(), 2);
        assert!(q.values.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_document_term_frequency_saturates() {
        let encoder = Bm25Encoder::new();
        let docs = encoder
            .encode_documents(&["rust", "rust rust rust rust rust rust rust rust"])
            .unwrap();
        let once = docs[0].values[0];
        let many = docs[1].values[0];
        assert!(many > once);
        // Bounded by k1 + 1 however often the term repeats
        assert!(many < 1.2 + 1.0);
    }

    #[test]
    fn test_same_token_same_index() {
        let encoder = Bm25Encoder::new();
        let q = encoder.encode_query("tokio").unwrap();
        let d = encoder.encode_documents(&["tokio runtime"]).unwrap();
        assert!(d[0].indices.contains(&q.indices[0]));
    }

    #[test]
    fn test_stop_words_only() {
        let encoder = Bm25Encoder::new();
        assert!(encoder.encode_query("how do I").unwrap().is_empty());
        assert!(encoder.uses_idf());
        assert_eq!(encoder.model_name(), "Qdrant/bm25");
    }
}
