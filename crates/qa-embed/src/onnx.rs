//! ONNX-based dense embedding model.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ndarray::ArrayViewD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use qa_core::{Embedder, EmbeddingConfig, QaError, Result};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// ONNX-based embedder for sentence-transformer style exports.
///
/// Inference runs on the blocking thread pool; the session itself is
/// serialized behind a mutex.
pub struct OnnxEmbedder {
    inner: Arc<Inner>,
}

struct Inner {
    /// ONNX inference session (wrapped in Mutex for interior mutability).
    session: Mutex<Session>,

    /// Tokenizer for the model.
    tokenizer: Tokenizer,

    model_name: String,
    dimension: usize,
    max_tokens: usize,
    token_type_ids: bool,
    query_prefix: String,
    document_prefix: String,
}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from the configured model directory.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let model_path = config.model_dir.join(MODEL_FILE);
        let tokenizer_path = config.model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            return Err(QaError::embedding(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = Self::build_session(&model_path, config.num_threads)?;

        info!("Loading tokenizer from {:?}", tokenizer_path);

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| QaError::embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!(
            "Embedder initialized: model={}, dim={}, max_tokens={}",
            config.model_name, config.dimension, config.max_tokens
        );

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                tokenizer,
                model_name: config.model_name.clone(),
                dimension: config.dimension,
                max_tokens: config.max_tokens,
                token_type_ids: config.token_type_ids,
                query_prefix: config.query_prefix.clone(),
                document_prefix: config.document_prefix.clone(),
            }),
        })
    }

    fn build_session(model_path: &Path, num_threads: usize) -> Result<Session> {
        info!("Loading ONNX model from {:?}", model_path);

        Session::builder()
            .map_err(|e| QaError::embedding(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| QaError::embedding(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(num_threads)
            .map_err(|e| QaError::embedding(format!("Failed to set thread count: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| QaError::embedding(format!("Failed to load model: {}", e)))
    }

    async fn embed_owned(&self, texts: Vec<String>, query: bool) -> Result<Vec<Vec<f32>>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let prefix = if query {
                &inner.query_prefix
            } else {
                &inner.document_prefix
            };
            inner.embed_batch(&texts, prefix)
        })
        .await
        .map_err(|e| QaError::internal(format!("Embedding task failed: {}", e)))?
    }
}

impl Inner {
    /// Embed a batch of texts with a given prefix.
    fn embed_batch(&self, texts: &[String], prefix: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prefixed: Vec<String> = texts.iter().map(|t| format!("{}{}", prefix, t)).collect();

        let encodings = self
            .tokenizer
            .encode_batch(prefixed, true)
            .map_err(|e| QaError::embedding(format!("Tokenization failed: {}", e)))?;

        // Pad to the longest input, capped at the model limit
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_tokens)
            .max(1);

        let batch_size = encodings.len();

        debug!("Embedding batch: size={}, max_len={}", batch_size, max_len);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            for j in 0..len {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];

        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids))
            .map_err(|e| QaError::embedding(format!("Failed to create input tensor: {}", e)))?;
        let attention_mask_tensor = Tensor::from_array((shape.clone(), attention_mask))
            .map_err(|e| QaError::embedding(format!("Failed to create mask tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| QaError::embedding(format!("Failed to lock session: {}", e)))?;

        let outputs = (if self.token_type_ids {
            let token_type_tensor = Tensor::from_array((shape, vec![0i64; batch_size * max_len]))
                .map_err(|e| {
                    QaError::embedding(format!("Failed to create token type tensor: {}", e))
                })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        })
        .map_err(|e| QaError::embedding(format!("Inference failed: {}", e)))?;

        // Different exports name the output differently; take the first one
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| QaError::embedding("No output tensor found"))?;

        let view = output
            .try_extract_array::<f32>()
            .map_err(|e| QaError::embedding(format!("Failed to extract tensor: {}", e)))?;

        let shape_dims: Vec<usize> = view.shape().to_vec();
        debug!("Output shape: {:?}", shape_dims);

        let embeddings: Vec<Vec<f32>> = match shape_dims.len() {
            // (batch_size, seq_len, hidden_dim)
            3 => mean_pool(&view, &encodings, max_len),
            // (batch_size, hidden_dim), already pooled
            2 => (0..batch_size)
                .map(|i| l2_normalize((0..shape_dims[1]).map(|j| view[[i, j]]).collect()))
                .collect(),
            _ => {
                return Err(QaError::embedding(format!(
                    "Unexpected output shape: {:?}",
                    shape_dims
                )))
            }
        };

        if let Some(first) = embeddings.first() {
            if first.len() != self.dimension {
                return Err(QaError::embedding(format!(
                    "Model produced {}-dim embeddings, configured dimension is {}",
                    first.len(),
                    self.dimension
                )));
            }
        }

        Ok(embeddings)
    }
}

/// Mean pooling over the sequence dimension with the attention mask.
fn mean_pool(
    tensor: &ArrayViewD<'_, f32>,
    encodings: &[tokenizers::Encoding],
    max_len: usize,
) -> Vec<Vec<f32>> {
    let shape = tensor.shape();
    let seq_len = shape[1];
    let hidden_dim = shape[2];

    let mut embeddings = Vec::with_capacity(encodings.len());

    for (i, encoding) in encodings.iter().enumerate() {
        let attention_mask = encoding.get_attention_mask();
        let mut sum = vec![0.0f32; hidden_dim];
        let mut valid = 0usize;

        for j in 0..max_len.min(seq_len).min(attention_mask.len()) {
            if attention_mask[j] == 1 {
                valid += 1;
                for (k, s) in sum.iter_mut().enumerate() {
                    *s += tensor[[i, j, k]];
                }
            }
        }

        if valid == 0 {
            embeddings.push(sum);
            continue;
        }

        let mean: Vec<f32> = sum.iter().map(|s| s / valid as f32).collect();
        embeddings.push(l2_normalize(mean));
    }

    embeddings
}

/// L2 normalize a vector.
pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let owned = texts.iter().map(|t| t.to_string()).collect();
        self.embed_owned(owned, false).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_owned(vec![text.to_string()], true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QaError::embedding("No embedding returned"))
    }

    fn dimension(&self) -> usize {
        self.inner.dimension
    }

    fn max_tokens(&self) -> usize {
        self.inner.max_tokens
    }

    fn model_name(&self) -> &str {
        &self.inner.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero() {
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_dir() {
        let config = EmbeddingConfig {
            model_dir: "/nonexistent/qa-search-model".into(),
            ..Default::default()
        };
        let err = match OnnxEmbedder::from_config(&config) {
            Ok(_) => panic!("expected missing model error"),
            Err(e) => e,
        };
        assert_eq!(err.error_code(), "EMBEDDING_ERROR");
        assert!(err.to_string().contains("model.onnx"));
    }
}
