//! qa-load - Load Q&A CSV exports into a hybrid collection
//!
//! The pipeline is: read questions, read answers, build records in the
//! configured layout ([`LoadMode`]), make sure the collection exists, then
//! embed and upsert in batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use qa_load::Loader;
//!
//! let loader = Loader::new(store, dense, sparse, &config);
//! let report = loader.run(&config.loader).await?;
//! println!("uploaded {} points", report.points);
//! ```

mod csv_source;
mod html;
mod loader;
mod progress;
mod records;

pub use csv_source::{read_answers, read_questions, AnswerSet, QuestionSet};
pub use html::strip_html;
pub use loader::{Loader, LoaderOptions};
pub use progress::UploadProgress;
pub use records::build_records;

// Re-export types for convenience
pub use qa_core::{LoadMode, LoadReport, QaRecord};
