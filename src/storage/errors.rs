//! Storage-specific error types for pure data operations.
//!
//! These errors represent failures in the storage layer only; authorization
//! and business-rule failures live in [`crate::providers::ProviderError`].

use thiserror::Error;

/// Errors that can occur during document-store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested document was not found.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// The document data cannot be stored or patched in its given shape.
    #[error("invalid document data: {0}")]
    InvalidData(String),

    /// Invalid query parameters or search criteria.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The backend is temporarily unreachable. Role resolution fails
    /// closed on this variant.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure for stored data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let err = StorageError::not_found("students", "s1");
        assert_eq!(err.to_string(), "document not found: students/s1");
    }
}
