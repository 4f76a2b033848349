//! Error types for qa-search.

use thiserror::Error;

/// Result type alias using QaError.
pub type Result<T> = std::result::Result<T, QaError>;

/// Errors that can occur while loading or searching.
#[derive(Error, Debug)]
pub enum QaError {
    /// Collection not found.
    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Malformed or unreadable CSV input.
    #[error("CSV error in {path}: {message}")]
    Csv { path: String, message: String },

    /// Vector store error.
    #[error("Vector store error: {message}")]
    Store { message: String },

    /// Embedding model error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl QaError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a CSV error for the given file.
    pub fn csv(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Csv {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error code used in HTTP error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CollectionNotFound { .. } => "COLLECTION_NOT_FOUND",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Csv { .. } => "CSV_ERROR",
            Self::Store { .. } => "STORE_ERROR",
            Self::Embedding { .. } => "EMBEDDING_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the error was caused by the caller rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QaError::CollectionNotFound {
            name: "stackoverflow".to_string(),
        };
        assert!(err.to_string().contains("stackoverflow"));

        let err = QaError::csv("answers.csv", "missing column `ParentId`");
        assert_eq!(
            err.to_string(),
            "CSV error in answers.csv: missing column `ParentId`"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            QaError::CollectionNotFound {
                name: "x".to_string()
            }
            .error_code(),
            "COLLECTION_NOT_FOUND"
        );
        assert_eq!(QaError::store("down").error_code(), "STORE_ERROR");
        assert_eq!(QaError::config("bad").error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_client_error() {
        assert!(QaError::invalid_argument("empty").is_client_error());
        assert!(!QaError::embedding("boom").is_client_error());
    }
}
