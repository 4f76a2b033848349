//! Collection bootstrap and batched upload.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use qa_core::{
    CollectionSchema, Distance, Embedder, LoadReport, LoaderConfig, QaConfig, QaError, QaPoint,
    QaRecord, Result, SparseEncoder, VectorStore,
};

use crate::csv_source::{read_answers, read_questions};
use crate::progress::UploadProgress;
use crate::records::build_records;

/// Options that don't belong in the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderOptions {
    /// Drop and recreate the collection before uploading.
    pub recreate: bool,

    /// Hide the progress bar.
    pub quiet: bool,
}

/// Loads records into one hybrid collection.
pub struct Loader {
    store: Arc<dyn VectorStore>,
    dense: Arc<dyn Embedder>,
    sparse: Arc<dyn SparseEncoder>,
    collection: String,
    dense_vector_name: String,
    sparse_vector_name: String,
    distance: Distance,
    batch_size: usize,
    options: LoaderOptions,
}

impl Loader {
    pub fn new(
        store: Arc<dyn VectorStore>,
        dense: Arc<dyn Embedder>,
        sparse: Arc<dyn SparseEncoder>,
        config: &QaConfig,
    ) -> Self {
        Self {
            store,
            dense,
            sparse,
            collection: config.store.collection.clone(),
            dense_vector_name: config.store.dense_vector_name.clone(),
            sparse_vector_name: config.store.sparse_vector_name.clone(),
            distance: config.store.distance,
            batch_size: config.loader.batch_size.max(1),
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Schema derived from the embedders in use.
    pub fn schema(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.collection.clone(),
            dense_vector_name: self.dense_vector_name.clone(),
            dense_size: self.dense.dimension() as u64,
            distance: self.distance,
            sparse_vector_name: self.sparse_vector_name.clone(),
            sparse_idf: self.sparse.uses_idf(),
        }
    }

    /// Create the collection if it is missing.
    ///
    /// Returns `true` when this call created it. An existing collection is
    /// left untouched unless `recreate` is set.
    pub async fn bootstrap_collection(&self) -> Result<bool> {
        let exists = self.store.collection_exists(&self.collection).await?;

        if exists && !self.options.recreate {
            debug!("Collection {} already exists", self.collection);
            return Ok(false);
        }
        if exists {
            warn!("Recreating collection {}", self.collection);
            self.store.delete_collection(&self.collection).await?;
        }

        let schema = self.schema();
        self.store.create_collection(&schema).await?;
        info!(
            "Created collection {} ({} dims, {}, sparse {})",
            schema.name, schema.dense_size, schema.distance, schema.sparse_vector_name
        );
        Ok(true)
    }

    /// Embed and upsert records in batches.
    ///
    /// Point ids are the record positions, starting at 0, so reloading the
    /// same data overwrites rather than duplicates.
    pub async fn upload(&self, records: &[QaRecord]) -> Result<usize> {
        let start = Instant::now();
        let progress = UploadProgress::new(records.len() as u64, self.options.quiet);
        let mut uploaded = 0usize;

        for (batch_idx, batch) in records.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|r| r.text.as_str()).collect();

            let dense = self.dense.embed_documents(&texts).await?;
            let sparse = self.sparse.encode_documents(&texts)?;
            if dense.len() != batch.len() || sparse.len() != batch.len() {
                return Err(QaError::embedding(format!(
                    "expected {} vectors, got {} dense and {} sparse",
                    batch.len(),
                    dense.len(),
                    sparse.len()
                )));
            }

            let base = batch_idx * self.batch_size;
            let points: Vec<QaPoint> = batch
                .iter()
                .zip(dense.into_iter().zip(sparse))
                .enumerate()
                .map(|(i, (record, (dense, sparse)))| QaPoint {
                    id: (base + i) as u64,
                    dense,
                    sparse,
                    payload: record.payload.clone(),
                })
                .collect();

            self.store.upsert_points(&self.collection, points).await?;
            uploaded += batch.len();
            progress.batch_uploaded(batch.len() as u64);
        }

        progress.finish();
        info!(
            "Uploaded {} points to {} in {}ms",
            uploaded,
            self.collection,
            start.elapsed().as_millis()
        );
        Ok(uploaded)
    }

    /// Bootstrap the collection, read both CSV files and upload.
    ///
    /// The collection exists afterwards even when the files hold no rows.
    pub async fn run(&self, config: &LoaderConfig) -> Result<LoadReport> {
        let created_collection = self.bootstrap_collection().await?;

        let questions = read_questions(
            &config.questions_path,
            config.question_limit,
            config.strip_html,
        )?;
        let answers = read_answers(&config.answers_path, &questions, config.strip_html)?;

        let records = build_records(config.mode, &questions, &answers)?;
        info!("Built {} {} records", records.len(), config.mode);

        let points = self.upload(&records).await?;

        Ok(LoadReport {
            questions: questions.len(),
            answers: answers.answers.len(),
            orphan_answers: answers.orphans,
            points,
            created_collection,
        })
    }
}
